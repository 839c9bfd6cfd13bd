// ==========================================
// 撿貨資訊聯邦查詢引擎 - 领域字段名
// ==========================================
// 字段名保持来源表头原文，部署内保持稳定
// ==========================================

/// MIC需求起日 (demand-start-date)
pub const DEMAND_START_DATE: &str = "MIC需求起日";

/// MIC需求訖日 (demand-end-date)
pub const DEMAND_END_DATE: &str = "MIC需求訖日";

/// 料號 (item-id)
pub const ITEM_ID: &str = "料號";

/// 版本 (item-version)
pub const ITEM_VERSION: &str = "版本";

/// 產品中文名稱 (item-name)
pub const ITEM_NAME: &str = "產品中文名稱";

/// 數量 (quantity)
pub const QUANTITY: &str = "數量";

/// 單價 (unit-price)
pub const UNIT_PRICE: &str = "單價";

/// PO單號 (purchase-order-no)
pub const PURCHASE_ORDER_NO: &str = "PO單號";

/// 庫存 (stock-level)
pub const STOCK_LEVEL: &str = "庫存";

/// 存储层内部主键
pub const STORAGE_ID: &str = "_id";

/// 撿貨結果输出字段（亦为可排序字段）
pub const PICK_FIELDS: [&str; 9] = [
    DEMAND_START_DATE,
    DEMAND_END_DATE,
    ITEM_ID,
    ITEM_VERSION,
    ITEM_NAME,
    QUANTITY,
    UNIT_PRICE,
    PURCHASE_ORDER_NO,
    STOCK_LEVEL,
];

/// 补全属性集
pub const ENRICHMENT_FIELDS: [&str; 3] = [ITEM_NAME, UNIT_PRICE, STOCK_LEVEL];

/// 日期字段（输出时统一为纯日期文本）
pub const DATE_FIELDS: [&str; 2] = [DEMAND_START_DATE, DEMAND_END_DATE];

/// 是否为内部/存储标识字段
pub fn is_internal_field(field: &str) -> bool {
    field.starts_with('_')
}

/// 是否为可识别的输出字段
pub fn is_pick_field(field: &str) -> bool {
    PICK_FIELDS.contains(&field)
}
