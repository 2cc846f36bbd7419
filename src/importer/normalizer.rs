// ==========================================
// 金矿物流溯源系统 - 文本规范化器
// ==========================================
// 职责: 本地化数值 / Jalali 日期 / 人员姓名 / 编号 → 规范类型
// 红线: 纯函数, 无状态; 空值返回 None（不是 0, 不是错误）
// ==========================================

use crate::config::registries::IdentityRegistry;
use crate::domain::calendar::JalaliDate;
use crate::domain::records::{CanonicalName, Concentration};
use crate::importer::error::NormalizeError;

/// 视为空值的占位符（大小写不敏感）
const PLACEHOLDERS: [&str; 7] = ["-", "—", "n/a", "na", "null", "none", "nan"];

/// 低于检出限的文字写法
const BELOW_LIMIT_TOKENS: [&str; 4] = ["nd", "n.d.", "bdl", "<dl"];

const DATE_SEPARATORS: [char; 5] = ['/', '-', '.', ' ', '\\'];

pub struct Normalizer;

impl Normalizer {
    /// 清洗本地化数值文本
    ///
    /// # 规则
    /// - 去除千分位（`,` / `٬` / 空白）
    /// - `/` 与 `٫` 视为小数点
    /// - 波斯/阿拉伯数字转 ASCII
    ///
    /// # 返回
    /// - Ok(None): 空值或占位符
    /// - Ok(Some(v)): 解析成功
    /// - Err(Format): 非数值内容
    pub fn clean_numeric(&self, text: &str) -> Result<Option<f64>, NormalizeError> {
        let ascii = to_ascii_digits(text);
        let trimmed = ascii.trim();
        if trimmed.is_empty() || is_placeholder(trimmed) {
            return Ok(None);
        }

        let cleaned: String = trimmed
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .map(|c| if c == '/' { '.' } else { c })
            .collect();

        match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            Ok(_) => Err(NormalizeError::Format {
                value: text.to_string(),
                message: "非有限数值".to_string(),
            }),
            Err(e) => Err(NormalizeError::Format {
                value: text.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// 规范化 Jalali 日期文本
    ///
    /// # 支持格式
    /// - `1404/9/09`, `1404-09-09`, `1404.9.9`（年在前）
    /// - `09/09/1404`（年在后）
    /// - `14040909`（紧凑）
    /// - 末尾携带时间的 `1404/09/09 00:00:00`
    ///
    /// 无法识别时返回 None 并记录原因, 绝不强行推断
    pub fn normalize_calendar_date(&self, text: &str) -> Option<JalaliDate> {
        let ascii = to_ascii_digits(text);
        let mut trimmed = ascii.trim();
        if trimmed.is_empty() {
            return None;
        }

        // 去掉时间部分
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() > 1 && tokens.iter().skip(1).all(|t| t.contains(':')) {
            trimmed = tokens[0];
        }

        let parts: Vec<&str> = if trimmed.len() == 8 && trimmed.chars().all(|c| c.is_ascii_digit())
        {
            vec![&trimmed[0..4], &trimmed[4..6], &trimmed[6..8]]
        } else {
            trimmed
                .split(|c| DATE_SEPARATORS.contains(&c))
                .filter(|p| !p.is_empty())
                .collect()
        };

        if parts.len() != 3 || !parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
            tracing::warn!(value = %text, "日期格式无法识别: 需要 年/月/日 三段数字");
            return None;
        }

        let (year, month, day) = if parts[0].len() == 4 {
            (parts[0], parts[1], parts[2])
        } else if parts[2].len() == 4 {
            (parts[2], parts[1], parts[0])
        } else {
            tracing::warn!(value = %text, "日期格式无法识别: 缺少 4 位年份");
            return None;
        };

        if month.len() > 2 || day.len() > 2 {
            tracing::warn!(value = %text, "日期格式无法识别: 月/日超过 2 位");
            return None;
        }

        let parsed = match (year.parse::<i32>(), month.parse::<u32>(), day.parse::<u32>()) {
            (Ok(y), Ok(m), Ok(d)) => JalaliDate::new(y, m, d),
            _ => None,
        };

        if parsed.is_none() {
            tracing::warn!(value = %text, "日期超出日历范围");
        }
        parsed
    }

    /// 人员姓名规范化（对照身份登记表）
    ///
    /// 未命中登记表时返回 Unknown, 不报错; 由校验器决定是否告警
    pub fn canonicalize_identity(&self, raw_name: &str, registry: &IdentityRegistry) -> CanonicalName {
        let normalized = self.normalize_identity_text(raw_name);
        match registry.lookup(&normalized) {
            Some(entry) => CanonicalName::Known {
                canonical: entry.canonical.clone(),
                raw: raw_name.trim().to_string(),
                status: entry.status.clone(),
            },
            None => CanonicalName::Unknown {
                raw: raw_name.trim().to_string(),
            },
        }
    }

    /// 姓名文本标准化: 统一阿拉伯/波斯字母变体, 去除 ZWNJ 与变音符, 压缩空白
    pub fn normalize_identity_text(&self, text: &str) -> String {
        let unified: String = text
            .chars()
            .filter(|c| !is_ignorable_mark(*c))
            .map(|c| match c {
                'ي' | 'ى' => 'ی',
                'ك' => 'ک',
                _ => c,
            })
            .collect();

        unified
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// 清洗整数型编号（去除浮点尾巴 `.0`）
    ///
    /// 例: `14978.0` → `14978`, `RCP-001` 保持不变
    pub fn clean_identifier_number(&self, text: &str) -> String {
        let ascii = to_ascii_digits(text);
        let trimmed = ascii.trim();

        if let Some((int_part, frac_part)) = trimmed.split_once('.') {
            let int_ok = !int_part.is_empty() && int_part.chars().all(|c| c.is_ascii_digit());
            let frac_zero = !frac_part.is_empty() && frac_part.chars().all(|c| c == '0');
            if int_ok && frac_zero {
                return int_part.to_string();
            }
        }
        trimmed.to_string()
    }

    /// 解析化验含量, 处理检出限写法（如 `<0.05`）
    pub fn parse_concentration(&self, text: &str) -> Result<Option<Concentration>, NormalizeError> {
        let ascii = to_ascii_digits(text);
        let trimmed = ascii.trim();
        if trimmed.is_empty() || is_placeholder(trimmed) {
            return Ok(None);
        }

        if BELOW_LIMIT_TOKENS.contains(&trimmed.to_lowercase().as_str()) {
            return Ok(Some(Concentration::BelowDetectionLimit { limit_ppm: None }));
        }

        if let Some(rest) = trimmed.strip_prefix('<') {
            // 检出限数值不可解析时仍然是低于检出限, 只是限值未知
            let limit_ppm = self.clean_numeric(rest).ok().flatten();
            return Ok(Some(Concentration::BelowDetectionLimit { limit_ppm }));
        }

        Ok(self
            .clean_numeric(trimmed)?
            .map(|ppm| Concentration::Measured { ppm }))
    }

    /// 运输费用（单价按吨, 重量按千克）
    pub fn transport_cost(&self, weight_kg: f64, cost_per_ton: f64) -> f64 {
        weight_kg / 1000.0 * cost_per_ton
    }
}

/// 波斯/阿拉伯-印度数字与分隔符转为 ASCII
fn to_ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            '\u{066C}' => ',',
            '\u{066B}' => '.',
            _ => c,
        })
        .collect()
}

fn is_placeholder(text: &str) -> bool {
    PLACEHOLDERS.contains(&text.to_lowercase().as_str())
}

fn is_ignorable_mark(c: char) -> bool {
    matches!(c, '\u{200C}' | '\u{200D}' | '\u{064B}'..='\u{0652}' | '\u{0670}' | '\u{0640}')
}
