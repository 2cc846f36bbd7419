// ==========================================
// 金矿物流溯源系统 - 样品编码描述符
// ==========================================
// 格式: <工厂 1 字母><年 4 位><月 2 位><日 2 位><类别 1-2 字母><序号 0+ 位>
// 示例: C14041014K2 → 工厂 C, 1404/10/14, 类别 K, 序号 2
// 红线: 只能由解析器构造（字段私有, 构造函数 crate 内可见）
// ==========================================

use crate::domain::calendar::JalaliDate;
use crate::domain::types::{FacilityCode, SampleCategory};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleCodeDescriptor {
    facility: FacilityCode,
    date: JalaliDate,
    category: SampleCategory,
    sequence: u32,
}

impl SampleCodeDescriptor {
    pub(crate) fn from_parts(
        facility: FacilityCode,
        date: JalaliDate,
        category: SampleCategory,
        sequence: u32,
    ) -> Self {
        Self {
            facility,
            date,
            category,
            sequence,
        }
    }

    pub fn facility(&self) -> FacilityCode {
        self.facility
    }

    pub fn date(&self) -> JalaliDate {
        self.date
    }

    pub fn category(&self) -> SampleCategory {
        self.category
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// 还原为规范样品编码（序号为 0 时省略）
    pub fn to_code(&self) -> String {
        let mut code = format!(
            "{}{}{}",
            self.facility,
            self.date.to_compact(),
            self.category.code()
        );
        if self.sequence > 0 {
            code.push_str(&self.sequence.to_string());
        }
        code
    }
}

impl fmt::Display for SampleCodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_code())
    }
}
