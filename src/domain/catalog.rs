//! 已知下游服務目錄
//!
//! 顯示名稱查詢使用這個靜態表；未知 ID 原樣返回。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub summary: &'static str,
    pub health_path: &'static str,
}

pub const CATALOG: &[ServiceDescriptor] = &[
    ServiceDescriptor {
        key: "aggregator",
        name: "Aggregator",
        summary: "Orchestrates requests and collects the answers of every service",
        health_path: "/health",
    },
    ServiceDescriptor {
        key: "ai_legal",
        name: "AI Legal",
        summary: "Legal review of contracts with an HTML report",
        health_path: "/legal/health",
    },
    ServiceDescriptor {
        key: "ai_econom",
        name: "AI Econom",
        summary: "Financial and economic checks",
        health_path: "/econom/health",
    },
    ServiceDescriptor {
        key: "ai_accountant",
        name: "AI Accountant",
        summary: "Accounting checks and specification reconciliation",
        health_path: "/accountant/health",
    },
    ServiceDescriptor {
        key: "ai_sb",
        name: "AI SB",
        summary: "Security and KYC checks of counterparties",
        health_path: "/sb/health",
    },
    ServiceDescriptor {
        key: "contract_extractor",
        name: "Contract Extractor",
        summary: "Extracts dates, amounts and parties from contracts",
        health_path: "/extractor/health",
    },
    ServiceDescriptor {
        key: "document_slicer",
        name: "Document Slicer",
        summary: "Splits documents into logical sections",
        health_path: "/slicer/health",
    },
    ServiceDescriptor {
        key: "budget_service",
        name: "Budget Service",
        summary: "Budget calculation and limit checks",
        health_path: "/budget/health",
    },
];

pub fn lookup(service_id: &str) -> Option<&'static ServiceDescriptor> {
    CATALOG.iter().find(|d| d.key == service_id)
}

pub fn display_name(service_id: &str) -> &str {
    lookup(service_id).map(|d| d.name).unwrap_or(service_id)
}
