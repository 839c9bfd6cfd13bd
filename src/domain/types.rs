// ==========================================
// 撿貨資訊聯邦查詢引擎 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 数据来源 (Source)
// ==========================================
// 序列化格式: snake_case (与默认集合名一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    PurchaseShipping, // 採購與出貨表
    InventoryNeed,    // 庫存與採購需求表
    CustomerNeed,     // 客戶需求表
    ProductMaster,    // 產品資料
    StockMovementLog, // 通用匯入表 (只写)
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::PurchaseShipping,
        SourceKind::InventoryNeed,
        SourceKind::CustomerNeed,
        SourceKind::ProductMaster,
        SourceKind::StockMovementLog,
    ];

    /// 需求来源（日期过滤 + 结果拼接顺序）
    pub fn demand_sources() -> [SourceKind; 3] {
        [
            SourceKind::PurchaseShipping,
            SourceKind::InventoryNeed,
            SourceKind::CustomerNeed,
        ]
    }

    /// 补全优先级: 产品主数据最权威，其后按需求来源固定顺序
    pub fn enrichment_priority() -> [SourceKind; 4] {
        [
            SourceKind::ProductMaster,
            SourceKind::PurchaseShipping,
            SourceKind::InventoryNeed,
            SourceKind::CustomerNeed,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::PurchaseShipping => "purchase_shipping",
            SourceKind::InventoryNeed => "inventory_need",
            SourceKind::CustomerNeed => "customer_need",
            SourceKind::ProductMaster => "products",
            SourceKind::StockMovementLog => "items",
        }
    }

    /// 默认集合名
    pub fn default_collection(&self) -> &'static str {
        self.as_str()
    }

    /// 中文显示名
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::PurchaseShipping => "採購與出貨表",
            SourceKind::InventoryNeed => "庫存與採購需求表",
            SourceKind::CustomerNeed => "客戶需求表",
            SourceKind::ProductMaster => "產品資料",
            SourceKind::StockMovementLog => "匯入資料",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "purchase_shipping" => Ok(SourceKind::PurchaseShipping),
            "inventory_need" => Ok(SourceKind::InventoryNeed),
            "customer_need" => Ok(SourceKind::CustomerNeed),
            "products" | "product_master" => Ok(SourceKind::ProductMaster),
            "items" | "stock_movement_log" => Ok(SourceKind::StockMovementLog),
            other => Err(format!("未知数据来源: {}", other)),
        }
    }
}

// ==========================================
// 排序方向 (Sort Order)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// 只有 `desc`（不区分大小写）为降序，其余一律升序
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_round_trip_names() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.as_str().parse::<SourceKind>().unwrap(), kind);
        }
        assert_eq!(
            "customer-need".parse::<SourceKind>().unwrap(),
            SourceKind::CustomerNeed
        );
        assert!("warehouse".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_enrichment_priority_starts_with_product_master() {
        let order = SourceKind::enrichment_priority();
        assert_eq!(order[0], SourceKind::ProductMaster);
        assert_eq!(&order[1..], &SourceKind::demand_sources()[..]);
    }

    #[test]
    fn test_sort_order_lenient() {
        assert_eq!(SortOrder::parse_lenient(Some("DESC")), SortOrder::Desc);
        assert_eq!(SortOrder::parse_lenient(Some("down")), SortOrder::Asc);
        assert_eq!(SortOrder::parse_lenient(None), SortOrder::Asc);
    }
}
