// ==========================================
// 金矿物流溯源系统 - 登记表
// ==========================================
// 工厂登记表 / 样品类别表 / 人员身份登记表
// 红线: 加载后只读, 单次运行内不再修改
// ==========================================

use crate::config::error::{ConfigResult, ConfigurationError};
use crate::domain::types::{FacilityCode, SampleCategory};
use crate::importer::normalizer::Normalizer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ==========================================
// FacilityRegistry - 工厂登记表
// ==========================================

/// 单个工厂的登记信息（facilities.json 中的一项）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityInfo {
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub name_fa: Option<String>,
    /// 卡车运输单据中的目的地写法
    #[serde(default)]
    pub truck_dest: Option<String>,
    /// 料仓转运表中的工作表名
    #[serde(default)]
    pub bunker_sheet: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacilityRegistry {
    facilities: BTreeMap<FacilityCode, FacilityInfo>,
}

impl FacilityRegistry {
    /// 从 facilities.json 的原始映射构造
    pub fn from_map(raw: BTreeMap<String, FacilityInfo>) -> ConfigResult<Self> {
        let mut facilities = BTreeMap::new();
        for (code, info) in raw {
            let facility = FacilityCode::parse(&code)
                .ok_or_else(|| ConfigurationError::UnknownFacility(code.clone()))?;
            facilities.insert(facility, info);
        }
        if facilities.is_empty() {
            return Err(ConfigurationError::EmptyFacilityRegistry);
        }
        Ok(Self { facilities })
    }

    /// 全部工厂均登记, 无附加信息（测试与默认场景）
    pub fn all() -> Self {
        Self {
            facilities: FacilityCode::ALL
                .iter()
                .map(|code| (*code, FacilityInfo::default()))
                .collect(),
        }
    }

    pub fn contains(&self, code: FacilityCode) -> bool {
        self.facilities.contains_key(&code)
    }

    pub fn get(&self, code: FacilityCode) -> Option<&FacilityInfo> {
        self.facilities.get(&code)
    }

    pub fn codes(&self) -> impl Iterator<Item = FacilityCode> + '_ {
        self.facilities.keys().copied()
    }

    /// 卡车目的地文本 → 工厂
    ///
    /// 先按 truck_dest 子串匹配, 再接受单个工厂字母
    pub fn facility_for_destination(&self, destination: &str) -> Option<FacilityCode> {
        let text = destination.trim();
        if text.is_empty() {
            return None;
        }
        for (code, info) in &self.facilities {
            if let Some(dest) = info.truck_dest.as_deref() {
                if !dest.is_empty() && text.contains(dest) {
                    return Some(*code);
                }
            }
        }
        FacilityCode::parse(text).filter(|code| self.contains(*code))
    }

    /// 转运工作表名 → 工厂
    ///
    /// 依次尝试: bunker_sheet 精确匹配 / bunker_sheet 子串匹配 / 单个工厂字母
    pub fn facility_for_sheet(&self, sheet_name: &str) -> Option<FacilityCode> {
        let name = sheet_name.trim();
        let sheets = || {
            self.facilities.iter().filter_map(|(code, info)| {
                info.bunker_sheet
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map(|s| (*code, s))
            })
        };

        if let Some((code, _)) = sheets().find(|(_, sheet)| *sheet == name) {
            return Some(code);
        }
        if let Some((code, _)) = sheets().find(|(_, sheet)| name.contains(sheet)) {
            return Some(code);
        }
        FacilityCode::parse(name).filter(|code| self.contains(*code))
    }
}

// ==========================================
// CategoryAlphabet - 样品类别表
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAlphabet {
    categories: BTreeMap<SampleCategory, String>,
}

impl CategoryAlphabet {
    pub fn from_map(raw: BTreeMap<String, String>) -> ConfigResult<Self> {
        let mut categories = BTreeMap::new();
        for (code, name) in raw {
            let category = SampleCategory::from_code(code.trim())
                .ok_or_else(|| ConfigurationError::UnknownCategory(code.clone()))?;
            categories.insert(category, name);
        }
        Ok(Self { categories })
    }

    pub fn all() -> Self {
        Self {
            categories: SampleCategory::ALL
                .iter()
                .map(|c| (*c, c.label().to_string()))
                .collect(),
        }
    }

    pub fn contains(&self, category: SampleCategory) -> bool {
        self.categories.contains_key(&category)
    }

    /// 按代码长度降序排列（解析时先尝试最长代码）
    pub fn codes_longest_first(&self) -> Vec<SampleCategory> {
        let mut codes: Vec<SampleCategory> = self.categories.keys().copied().collect();
        codes.sort_by(|a, b| b.code().len().cmp(&a.code().len()).then(a.cmp(b)));
        codes
    }

    pub fn name(&self, category: SampleCategory) -> Option<&str> {
        self.categories.get(&category).map(String::as_str)
    }
}

impl Default for CategoryAlphabet {
    fn default() -> Self {
        Self::all()
    }
}

// ==========================================
// IdentityRegistry - 人员身份登记表
// ==========================================

/// drivers.json 中单个规范名的条目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityEntry {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "active".to_string()
}

/// drivers.json 文件结构
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriversFile {
    #[serde(default)]
    pub canonical_drivers: BTreeMap<String, IdentityEntry>,
}

/// 查询命中的规范身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredIdentity {
    pub canonical: String,
    pub status: String,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    /// 标准化写法 → 规范身份
    by_variant: HashMap<String, RegisteredIdentity>,
    /// 规范名 → 已登记写法
    variants: BTreeMap<String, BTreeSet<String>>,
}

impl IdentityRegistry {
    /// 从 drivers.json 构造
    ///
    /// 规范名本身也作为一种写法登记; 同一写法指向两个规范名时报错
    pub fn from_file(file: DriversFile) -> ConfigResult<Self> {
        let normalizer = Normalizer;
        let mut registry = Self::default();

        for (canonical, entry) in file.canonical_drivers {
            let identity = RegisteredIdentity {
                canonical: canonical.trim().to_string(),
                status: entry.status.clone(),
            };

            let spellings = std::iter::once(&canonical).chain(entry.aliases.iter());
            for spelling in spellings {
                let key = normalizer.normalize_identity_text(spelling);
                if key.is_empty() {
                    continue;
                }

                if let Some(existing) = registry.by_variant.get(&key) {
                    if existing.canonical != identity.canonical {
                        return Err(ConfigurationError::AmbiguousAlias {
                            variant: spelling.clone(),
                            first: existing.canonical.clone(),
                            second: identity.canonical.clone(),
                        });
                    }
                    continue;
                }

                registry.by_variant.insert(key, identity.clone());
                registry
                    .variants
                    .entry(identity.canonical.clone())
                    .or_default()
                    .insert(spelling.trim().to_string());
            }
        }

        Ok(registry)
    }

    /// 按标准化写法查询
    pub fn lookup(&self, normalized: &str) -> Option<&RegisteredIdentity> {
        self.by_variant.get(normalized)
    }

    /// 规范名的全部登记写法
    pub fn variants_of(&self, canonical: &str) -> Option<&BTreeSet<String>> {
        self.variants.get(canonical)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
