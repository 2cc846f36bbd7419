// ==========================================
// 金矿物流溯源系统 - 伊朗历（Jalali）日期
// ==========================================
// 职责: 日期合法性校验 + 规范化输出 YYYY/MM/DD + 日序号差值
// 月长: 1-6 月 31 天, 7-11 月 30 天, 12 月 29 天（闰年 30 天）
// 闰年: 33 年周期, year mod 33 ∈ {1,5,9,13,17,22,26,30}
// ==========================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const LEAP_RESIDUES: [i32; 8] = [1, 5, 9, 13, 17, 22, 26, 30];

/// Jalali 日历日期（不可变值对象）
///
/// 字段顺序即比较顺序（年 → 月 → 日）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JalaliDate {
    year: i32,
    month: u32,
    day: u32,
}

impl JalaliDate {
    /// 构造并校验日期
    ///
    /// # 返回
    /// - Some(date): 合法日期
    /// - None: 月份/日期越界（含非闰年 12/30）
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        if !(1..=9999).contains(&year) || !(1..=12).contains(&month) || day == 0 {
            return None;
        }
        if day > Self::month_length(year, month) {
            return None;
        }
        Some(Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn is_leap_year(year: i32) -> bool {
        LEAP_RESIDUES.contains(&year.rem_euclid(33))
    }

    pub fn month_length(year: i32, month: u32) -> u32 {
        match month {
            1..=6 => 31,
            7..=11 => 30,
            12 if Self::is_leap_year(year) => 30,
            12 => 29,
            _ => 0,
        }
    }

    /// 自 0001/01/01 起的日序号
    pub fn ordinal(&self) -> i64 {
        let prior_years = i64::from(self.year - 1);
        let full_cycles = prior_years / 33;
        let remainder = (prior_years % 33) as i32;
        let leap_days = full_cycles * 8
            + LEAP_RESIDUES.iter().filter(|r| **r <= remainder).count() as i64;

        let days_before_month = if self.month <= 7 {
            i64::from(self.month - 1) * 31
        } else {
            186 + i64::from(self.month - 7) * 30
        };

        prior_years * 365 + leap_days + days_before_month + i64::from(self.day) - 1
    }

    /// 与另一日期相差的天数（other - self）
    pub fn days_until(&self, other: &JalaliDate) -> i64 {
        other.ordinal() - self.ordinal()
    }

    /// 紧凑形式 YYYYMMDD（样品编码中使用）
    pub fn to_compact(&self) -> String {
        format!("{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for JalaliDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}/{:02}", self.year, self.month, self.day)
    }
}

/// 仅解析规范形式 YYYY/MM/DD；其他写法请走 Normalizer
impl FromStr for JalaliDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 3 || parts[0].len() != 4 || parts[1].len() != 2 || parts[2].len() != 2 {
            return Err(format!("不是规范日期格式 YYYY/MM/DD: {}", s));
        }
        let year = parts[0].parse::<i32>().map_err(|e| e.to_string())?;
        let month = parts[1].parse::<u32>().map_err(|e| e.to_string())?;
        let day = parts[2].parse::<u32>().map_err(|e| e.to_string())?;
        JalaliDate::new(year, month, day).ok_or_else(|| format!("非法日历日期: {}", s))
    }
}

impl Serialize for JalaliDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for JalaliDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_lengths() {
        assert!(JalaliDate::new(1404, 6, 31).is_some());
        assert!(JalaliDate::new(1404, 7, 31).is_none());
        assert!(JalaliDate::new(1404, 11, 30).is_some());
        assert!(JalaliDate::new(1404, 13, 1).is_none());
        assert!(JalaliDate::new(1404, 1, 0).is_none());
    }

    #[test]
    fn test_leap_years() {
        // 1403 为闰年, 1404 不是
        assert!(JalaliDate::is_leap_year(1403));
        assert!(!JalaliDate::is_leap_year(1404));
        assert!(JalaliDate::new(1403, 12, 30).is_some());
        assert!(JalaliDate::new(1404, 12, 30).is_none());
    }

    #[test]
    fn test_ordinal_crosses_month_and_year() {
        let a = JalaliDate::new(1404, 6, 31).unwrap();
        let b = JalaliDate::new(1404, 7, 1).unwrap();
        assert_eq!(a.days_until(&b), 1);

        let end_leap = JalaliDate::new(1403, 12, 30).unwrap();
        let new_year = JalaliDate::new(1404, 1, 1).unwrap();
        assert_eq!(end_leap.days_until(&new_year), 1);

        let end_common = JalaliDate::new(1404, 12, 29).unwrap();
        let next = JalaliDate::new(1405, 1, 1).unwrap();
        assert_eq!(end_common.days_until(&next), 1);
    }

    #[test]
    fn test_year_length_matches_leap_rule() {
        let y1403 = JalaliDate::new(1403, 1, 1).unwrap();
        let y1404 = JalaliDate::new(1404, 1, 1).unwrap();
        let y1405 = JalaliDate::new(1405, 1, 1).unwrap();
        assert_eq!(y1403.days_until(&y1404), 366);
        assert_eq!(y1404.days_until(&y1405), 365);
    }

    #[test]
    fn test_display_and_parse() {
        let d = JalaliDate::new(1404, 9, 9).unwrap();
        assert_eq!(d.to_string(), "1404/09/09");
        assert_eq!(d.to_compact(), "14040909");
        assert_eq!("1404/09/09".parse::<JalaliDate>().unwrap(), d);
        assert!("1404/9/09".parse::<JalaliDate>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let d = JalaliDate::new(1404, 10, 14).unwrap();
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, "\"1404/10/14\"");
        let back: JalaliDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
