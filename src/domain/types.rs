// ==========================================
// 金矿物流溯源系统 - 领域类型定义
// ==========================================
// 职责: 工厂代码 / 样品类别 / 告警级别 / 记录类型
// 红线: 类别与工厂均为封闭集合,未注册值一律拒绝
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 加工厂代码 (Facility Code)
// ==========================================
// 单一矿源 → 三个中间加工厂 → 单一下游处理点
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FacilityCode {
    A,
    B,
    C,
}

impl FacilityCode {
    pub const ALL: [FacilityCode; 3] = [FacilityCode::A, FacilityCode::B, FacilityCode::C];

    /// 从单字母解析（区分大小写）
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'A' => Some(FacilityCode::A),
            'B' => Some(FacilityCode::B),
            'C' => Some(FacilityCode::C),
            _ => None,
        }
    }

    /// 从文本解析（去除首尾空白后必须恰为一个字母）
    pub fn parse(text: &str) -> Option<Self> {
        let mut chars = text.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_letter(c),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            FacilityCode::A => 'A',
            FacilityCode::B => 'B',
            FacilityCode::C => 'C',
        }
    }
}

impl fmt::Display for FacilityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// ==========================================
// 样品类别 (Sample Category)
// ==========================================
// 编码字母表: K / L / T / CR / RC
// 决定哪些校验规则适用
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SampleCategory {
    #[serde(rename = "K")]
    OreInput, // 入料矿石
    #[serde(rename = "L")]
    Solution, // 溶液
    #[serde(rename = "T")]
    Tailings, // 尾矿
    #[serde(rename = "CR")]
    Carbon, // 活性炭
    #[serde(rename = "RC")]
    ReturnWater, // 回水
}

impl SampleCategory {
    pub const ALL: [SampleCategory; 5] = [
        SampleCategory::OreInput,
        SampleCategory::Solution,
        SampleCategory::Tailings,
        SampleCategory::Carbon,
        SampleCategory::ReturnWater,
    ];

    /// 样品编码中的类别代码
    pub fn code(&self) -> &'static str {
        match self {
            SampleCategory::OreInput => "K",
            SampleCategory::Solution => "L",
            SampleCategory::Tailings => "T",
            SampleCategory::Carbon => "CR",
            SampleCategory::ReturnWater => "RC",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// 业务名称（用于报表与告警文本）
    pub fn label(&self) -> &'static str {
        match self {
            SampleCategory::OreInput => "ore-input",
            SampleCategory::Solution => "solution",
            SampleCategory::Tailings => "tailings",
            SampleCategory::Carbon => "carbon",
            SampleCategory::ReturnWater => "return-water",
        }
    }
}

impl fmt::Display for SampleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ==========================================
// 告警级别 (Severity)
// ==========================================
// 顺序: Critical < Warning（排序后严重级别在前）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "warning" => Some(Severity::Warning),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 记录类型 (Record Type)
// ==========================================
// 三条独立数据流: 运输 / 料仓转运 / 化验
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Shipment,
    Transfer,
    Assay,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Shipment => "shipment",
            RecordType::Transfer => "transfer",
            RecordType::Assay => "assay",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "shipment" => Some(RecordType::Shipment),
            "transfer" => Some(RecordType::Transfer),
            "assay" => Some(RecordType::Assay),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facility_parse() {
        assert_eq!(FacilityCode::parse(" B "), Some(FacilityCode::B));
        assert_eq!(FacilityCode::parse("b"), None);
        assert_eq!(FacilityCode::parse("AB"), None);
        assert_eq!(FacilityCode::parse(""), None);
    }

    #[test]
    fn test_category_codes() {
        assert_eq!(SampleCategory::from_code("CR"), Some(SampleCategory::Carbon));
        assert_eq!(SampleCategory::from_code("K"), Some(SampleCategory::OreInput));
        assert_eq!(SampleCategory::from_code("C"), None);
        for c in SampleCategory::ALL {
            assert_eq!(SampleCategory::from_code(c.code()), Some(c));
        }
    }

    #[test]
    fn test_severity_order() {
        let mut levels = vec![Severity::Warning, Severity::Critical, Severity::Warning];
        levels.sort();
        assert_eq!(levels[0], Severity::Critical);
    }

    #[test]
    fn test_category_serde_uses_code() {
        let json = serde_json::to_string(&SampleCategory::ReturnWater).unwrap();
        assert_eq!(json, "\"RC\"");
        let back: SampleCategory = serde_json::from_str("\"T\"").unwrap();
        assert_eq!(back, SampleCategory::Tailings);
    }
}
