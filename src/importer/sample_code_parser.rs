// ==========================================
// 金矿物流溯源系统 - 样品编码解析器
// ==========================================
// 语法: ^[A-Z]\d{8}[A-Z]{1,2}\d*$
//       工厂字母 + 8 位 Jalali 日期 + 1-2 位类别 + 可选序号
// 兼容: 旧式空格分隔写法 `C 1404 10 14 K2`（月/日可为 1 位）
// 红线: 从不猜测; 任一字段不可信即整体失败
// ==========================================

use crate::config::error::{ConfigResult, ConfigurationError};
use crate::config::registries::{CategoryAlphabet, FacilityRegistry};
use crate::domain::calendar::JalaliDate;
use crate::domain::sample_code::SampleCodeDescriptor;
use crate::domain::types::{FacilityCode, SampleCategory};
use crate::importer::error::SampleCodeError;
use regex::Regex;
use std::collections::BTreeSet;

const GRAMMAR: &str = r"^([A-Z])(\d{4})(\d{2})(\d{2})([A-Z]{1,2})(\d*)$";
const LEGACY_SPACED: &str = r"^([A-Z])\s+(\d{4})\s+(\d{1,2})\s+(\d{1,2})\s+([A-Z]{1,2}\d*)$";

pub struct SampleCodeParser {
    grammar: Regex,
    legacy: Regex,
    facilities: BTreeSet<FacilityCode>,
    /// 已登记类别, 最长代码优先
    categories: Vec<SampleCategory>,
}

impl SampleCodeParser {
    pub fn new(facilities: &FacilityRegistry, categories: &CategoryAlphabet) -> ConfigResult<Self> {
        Ok(Self {
            grammar: compile(GRAMMAR)?,
            legacy: compile(LEGACY_SPACED)?,
            facilities: facilities.codes().collect(),
            categories: categories.codes_longest_first(),
        })
    }

    /// 解析样品编码
    ///
    /// # 返回
    /// - Ok(descriptor): 四个字段全部可信
    /// - Err(SampleCodeError): 结构不符 / 工厂未登记 / 日期非法 / 类别未登记
    pub fn parse(&self, code: &str) -> Result<SampleCodeDescriptor, SampleCodeError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(SampleCodeError::Empty);
        }

        let compact = if trimmed.chars().any(char::is_whitespace) {
            self.compact_legacy(trimmed)?
        } else {
            trimmed.to_string()
        };

        let caps = self
            .grammar
            .captures(&compact)
            .ok_or_else(|| SampleCodeError::Malformed {
                code: trimmed.to_string(),
                message: "需要 工厂字母 + 8 位日期 + 1-2 位类别 + 可选序号".to_string(),
            })?;

        // 捕获组均为必选组, 匹配成功时一定存在
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

        let facility = group(1)
            .chars()
            .next()
            .and_then(FacilityCode::from_letter)
            .filter(|f| self.facilities.contains(f))
            .ok_or_else(|| SampleCodeError::UnknownFacility {
                code: trimmed.to_string(),
                facility: group(1).to_string(),
            })?;

        let date = parse_date(group(2), group(3), group(4)).ok_or_else(|| {
            SampleCodeError::InvalidDate {
                code: trimmed.to_string(),
                date: format!("{}/{}/{}", group(2), group(3), group(4)),
            }
        })?;

        let category = self.match_category(trimmed, group(5))?;

        let digits = group(6);
        let sequence = if digits.is_empty() {
            0
        } else {
            digits.parse::<u32>().map_err(|_| SampleCodeError::Malformed {
                code: trimmed.to_string(),
                message: format!("序号超出范围: {}", digits),
            })?
        };

        Ok(SampleCodeDescriptor::from_parts(facility, date, category, sequence))
    }

    /// 类别匹配: 最长代码优先, 必须完整消费全部字母
    fn match_category(&self, code: &str, letters: &str) -> Result<SampleCategory, SampleCodeError> {
        if let Some(category) = self.categories.iter().find(|c| c.code() == letters) {
            return Ok(*category);
        }

        if let Some(prefix) = self.categories.iter().find(|c| letters.starts_with(c.code())) {
            return Err(SampleCodeError::Malformed {
                code: code.to_string(),
                message: format!(
                    "类别 {} 之后存在多余字母 '{}'",
                    prefix.code(),
                    &letters[prefix.code().len()..]
                ),
            });
        }

        Err(SampleCodeError::UnknownCategory {
            code: code.to_string(),
            category: letters.to_string(),
        })
    }

    /// 旧式空格写法 → 紧凑写法（月/日补零）
    fn compact_legacy(&self, text: &str) -> Result<String, SampleCodeError> {
        let caps = self
            .legacy
            .captures(text)
            .ok_or_else(|| SampleCodeError::Malformed {
                code: text.to_string(),
                message: "空格分隔写法需为 `F YYYY M D 类别序号`".to_string(),
            })?;
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

        Ok(format!(
            "{}{}{:0>2}{:0>2}{}",
            group(1),
            group(2),
            group(3),
            group(4),
            group(5)
        ))
    }
}

fn compile(pattern: &str) -> ConfigResult<Regex> {
    Regex::new(pattern).map_err(|e| ConfigurationError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn parse_date(year: &str, month: &str, day: &str) -> Option<JalaliDate> {
    match (year.parse::<i32>(), month.parse::<u32>(), day.parse::<u32>()) {
        (Ok(y), Ok(m), Ok(d)) => JalaliDate::new(y, m, d),
        _ => None,
    }
}
