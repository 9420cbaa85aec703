//! Type-Group-Instance identifiers and the classification registry.
//!
//! Every entry in a DBPF archive is named by three 32 bit numbers. The type decides how the
//! entry body is laid out, the group usually narrows it down to a family of game objects and
//! the instance picks one member of that family.
//!
//! [`Tgi`] is the concrete identity of an entry. [`TgiMask`] is a pattern over identities where
//! any field may be left as a wildcard, and is what the classification [`registry`] is made of.

use core::fmt;
use core::str::FromStr;

use derive_more::Display;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Concrete identity of an entry
#[derive(Display, Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("{type_id:#010X}-{group_id:#010X}-{instance_id:#010X}")]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tgi {
    /// Type ID, decides the body layout
    pub type_id: u32,
    /// Group ID
    pub group_id: u32,
    /// Instance ID
    pub instance_id: u32,
}

impl Tgi {
    /// Create a new identity
    pub const fn new(type_id: u32, group_id: u32, instance_id: u32) -> Self {
        Self {
            type_id,
            group_id,
            instance_id,
        }
    }

    /// Whether every concrete field of `pattern` equals the same field of `self`
    ///
    /// Wildcards in `pattern` are skipped, so [`TgiMask::BLANK`] matches anything.
    pub const fn matches(&self, pattern: &TgiMask) -> bool {
        field_matches(self.type_id, pattern.type_id)
            && field_matches(self.group_id, pattern.group_id)
            && field_matches(self.instance_id, pattern.instance_id)
    }

    /// Find the first registry pattern this identity matches
    pub fn classify(&self) -> TgiKind {
        REGISTRY
            .iter()
            .find(|(pattern, _)| self.matches(pattern))
            .map(|(_, kind)| *kind)
            .unwrap_or(TgiKind::Unknown)
    }

    /// Human readable name of this identity's classification
    pub fn label(&self) -> &'static str {
        self.classify().label()
    }
}

const fn field_matches(value: u32, pattern: Option<u32>) -> bool {
    match pattern {
        Some(expected) => value == expected,
        None => true,
    }
}

impl From<(u32, u32, u32)> for Tgi {
    fn from((type_id, group_id, instance_id): (u32, u32, u32)) -> Self {
        Self::new(type_id, group_id, instance_id)
    }
}

/// Failure to read a [`Tgi`] from text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseTgiError {
    /// expected three fields separated by '-', found {0}
    #[error("expected three fields separated by '-', found {0}")]
    FieldCount(usize),

    /// field {0:?} is not a hexadecimal number
    #[error("field {0:?} is not a hexadecimal number")]
    InvalidField(String),
}

impl FromStr for Tgi {
    type Err = ParseTgiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s
            .split('-')
            .map(|field| {
                let digits = field
                    .trim()
                    .trim_start_matches("0x")
                    .trim_start_matches("0X");
                u32::from_str_radix(digits, 16)
                    .map_err(|_| ParseTgiError::InvalidField(field.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match fields[..] {
            [type_id, group_id, instance_id] => Ok(Tgi::new(type_id, group_id, instance_id)),
            _ => Err(ParseTgiError::FieldCount(fields.len())),
        }
    }
}

/// A pattern over identities, `None` fields match any value
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TgiMask {
    /// Type ID to match
    pub type_id: Option<u32>,
    /// Group ID to match
    pub group_id: Option<u32>,
    /// Instance ID to match
    pub instance_id: Option<u32>,
}

impl TgiMask {
    /// The all wildcard pattern
    pub const BLANK: TgiMask = TgiMask::new(None, None, None);

    /// Create a new pattern
    pub const fn new(type_id: Option<u32>, group_id: Option<u32>, instance_id: Option<u32>) -> Self {
        Self {
            type_id,
            group_id,
            instance_id,
        }
    }

    /// Pattern matching every entry of one type
    pub const fn of_type(type_id: u32) -> Self {
        Self::new(Some(type_id), None, None)
    }

    /// Pattern matching every entry of one type and group
    pub const fn of_type_group(type_id: u32, group_id: u32) -> Self {
        Self::new(Some(type_id), Some(group_id), None)
    }

    /// Pattern matching exactly one identity
    pub const fn exact(type_id: u32, group_id: u32, instance_id: u32) -> Self {
        Self::new(Some(type_id), Some(group_id), Some(instance_id))
    }

    /// Whether every field is a wildcard
    pub const fn is_blank(&self) -> bool {
        self.type_id.is_none() && self.group_id.is_none() && self.instance_id.is_none()
    }
}

impl From<Tgi> for TgiMask {
    fn from(value: Tgi) -> Self {
        Self::exact(value.type_id, value.group_id, value.instance_id)
    }
}

impl fmt::Display for TgiMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = |value: Option<u32>| match value {
            Some(v) => format!("{v:#010X}"),
            None => "*".to_string(),
        };
        write!(
            f,
            "{}-{}-{}",
            field(self.type_id),
            field(self.group_id),
            field(self.instance_id)
        )
    }
}

/// Type ID of exemplar entries
pub const TYPE_EXEMPLAR: u32 = 0x6534_284A;
/// Type ID of cohort entries
pub const TYPE_COHORT: u32 = 0x0534_2861;
/// Type ID of localized text entries
pub const TYPE_LTEXT: u32 = 0x2026_960B;
/// Type ID of FSH texture entries
pub const TYPE_FSH: u32 = 0x7AB5_0E44;
/// Type ID of S3D model entries
pub const TYPE_S3D: u32 = 0x5AD0_E817;
/// Type ID of SC4Path entries
pub const TYPE_SC4PATH: u32 = 0x2966_78F7;
/// Type ID of PNG image entries
pub const TYPE_PNG: u32 = 0x856D_DBAC;
/// Type ID of Lua script entries
pub const TYPE_LUA: u32 = 0xCA63_E2A3;

/// Identity of the compressed entry directory
pub const DIRECTORY: Tgi = Tgi::new(0xE86B_1EEF, 0xE86B_1EEF, 0x286B_1F03);

/// Closed set of entry classifications
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TgiKind {
    Directory,
    ExemplarRoad,
    ExemplarStreet,
    ExemplarOneWayRoad,
    ExemplarAvenue,
    ExemplarHighway,
    ExemplarGroundHighway,
    ExemplarDirtRoad,
    ExemplarRail,
    ExemplarLightRail,
    ExemplarMonorail,
    ExemplarPowerPole,
    ExemplarT21,
    Exemplar,
    Cohort,
    LText,
    FshMisc,
    FshBaseOverlay,
    FshShadow,
    FshAnimProps,
    FshAnimNonProps,
    FshTerrainFoundation,
    FshUi,
    Fsh,
    S3dMaxis,
    S3d,
    Sc4Path2d,
    Sc4Path3d,
    Sc4Path,
    PngMenuIcon,
    PngUi,
    Png,
    LuaGenerator,
    LuaAdvisor,
    Lua,
    Atc,
    Avp,
    Ui,
    Ini,
    NetworkRules,
    EffectDirectory,
    KeyConfig,
    LotDefinition,
    Unknown,
}

impl TgiKind {
    /// Human readable name
    pub const fn label(&self) -> &'static str {
        match self {
            TgiKind::Directory => "DIR",
            TgiKind::ExemplarRoad => "EXEMPLAR_ROAD",
            TgiKind::ExemplarStreet => "EXEMPLAR_STREET",
            TgiKind::ExemplarOneWayRoad => "EXEMPLAR_ONEWAYROAD",
            TgiKind::ExemplarAvenue => "EXEMPLAR_AVENUE",
            TgiKind::ExemplarHighway => "EXEMPLAR_HIGHWAY",
            TgiKind::ExemplarGroundHighway => "EXEMPLAR_GROUNDHIGHWAY",
            TgiKind::ExemplarDirtRoad => "EXEMPLAR_DIRTROAD",
            TgiKind::ExemplarRail => "EXEMPLAR_RAIL",
            TgiKind::ExemplarLightRail => "EXEMPLAR_LIGHTRAIL",
            TgiKind::ExemplarMonorail => "EXEMPLAR_MONORAIL",
            TgiKind::ExemplarPowerPole => "EXEMPLAR_POWERPOLE",
            TgiKind::ExemplarT21 => "EXEMPLAR_T21",
            TgiKind::Exemplar => "EXEMPLAR",
            TgiKind::Cohort => "COHORT",
            TgiKind::LText => "LTEXT",
            TgiKind::FshMisc => "FSH_MISC",
            TgiKind::FshBaseOverlay => "FSH_BASE_OVERLAY",
            TgiKind::FshShadow => "FSH_SHADOW",
            TgiKind::FshAnimProps => "FSH_ANIM_PROPS",
            TgiKind::FshAnimNonProps => "FSH_ANIM_NONPROPS",
            TgiKind::FshTerrainFoundation => "FSH_TERRAIN_FOUNDATION",
            TgiKind::FshUi => "FSH_UI",
            TgiKind::Fsh => "FSH",
            TgiKind::S3dMaxis => "S3D_MAXIS",
            TgiKind::S3d => "S3D",
            TgiKind::Sc4Path2d => "SC4PATH_2D",
            TgiKind::Sc4Path3d => "SC4PATH_3D",
            TgiKind::Sc4Path => "SC4PATH",
            TgiKind::PngMenuIcon => "PNG_MENUICON",
            TgiKind::PngUi => "PNG_UI",
            TgiKind::Png => "PNG",
            TgiKind::LuaGenerator => "LUA_GEN",
            TgiKind::LuaAdvisor => "LUA_ADVISOR",
            TgiKind::Lua => "LUA",
            TgiKind::Atc => "ATC",
            TgiKind::Avp => "AVP",
            TgiKind::Ui => "UI",
            TgiKind::Ini => "INI",
            TgiKind::NetworkRules => "RUL",
            TgiKind::EffectDirectory => "EFFDIR",
            TgiKind::KeyConfig => "KEYCFG",
            TgiKind::LotDefinition => "LD",
            TgiKind::Unknown => "UNKNOWN",
        }
    }

    /// Whether entries of this kind hold exemplar or cohort properties
    pub const fn is_exemplar(&self) -> bool {
        matches!(
            self,
            TgiKind::ExemplarRoad
                | TgiKind::ExemplarStreet
                | TgiKind::ExemplarOneWayRoad
                | TgiKind::ExemplarAvenue
                | TgiKind::ExemplarHighway
                | TgiKind::ExemplarGroundHighway
                | TgiKind::ExemplarDirtRoad
                | TgiKind::ExemplarRail
                | TgiKind::ExemplarLightRail
                | TgiKind::ExemplarMonorail
                | TgiKind::ExemplarPowerPole
                | TgiKind::ExemplarT21
                | TgiKind::Exemplar
                | TgiKind::Cohort
        )
    }

    /// File extension used when extracting entries of this kind
    pub const fn extension(&self) -> &'static str {
        match self {
            TgiKind::Directory => "dir",
            TgiKind::Cohort => "cqz",
            TgiKind::LText => "ltext",
            TgiKind::FshMisc
            | TgiKind::FshBaseOverlay
            | TgiKind::FshShadow
            | TgiKind::FshAnimProps
            | TgiKind::FshAnimNonProps
            | TgiKind::FshTerrainFoundation
            | TgiKind::FshUi
            | TgiKind::Fsh => "fsh",
            TgiKind::S3dMaxis | TgiKind::S3d => "s3d",
            TgiKind::Sc4Path2d | TgiKind::Sc4Path3d | TgiKind::Sc4Path => "sc4path",
            TgiKind::PngMenuIcon | TgiKind::PngUi | TgiKind::Png => "png",
            TgiKind::LuaGenerator | TgiKind::LuaAdvisor | TgiKind::Lua => "lua",
            TgiKind::Atc => "atc",
            TgiKind::Avp => "avp",
            TgiKind::Ui => "ui",
            TgiKind::Ini => "ini",
            TgiKind::NetworkRules => "rul",
            TgiKind::EffectDirectory => "effdir",
            TgiKind::KeyConfig => "keycfg",
            TgiKind::LotDefinition => "ld",
            TgiKind::Unknown => "bin",
            _ => "eqz",
        }
    }
}

impl fmt::Display for TgiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered classification patterns, most specific first
///
/// The last pattern is [`TgiMask::BLANK`], so every identity classifies.
static REGISTRY: [(TgiMask, TgiKind); 44] = [
    (TgiMask::exact(0xE86B_1EEF, 0xE86B_1EEF, 0x286B_1F03), TgiKind::Directory),
    (TgiMask::of_type_group(TYPE_EXEMPLAR, 0x2821_ED93), TgiKind::ExemplarRoad),
    (TgiMask::of_type_group(TYPE_EXEMPLAR, 0x89AC_5643), TgiKind::ExemplarStreet),
    (TgiMask::of_type_group(TYPE_EXEMPLAR, 0xCBE0_84CB), TgiKind::ExemplarOneWayRoad),
    (TgiMask::of_type_group(TYPE_EXEMPLAR, 0xCB73_0FAC), TgiKind::ExemplarAvenue),
    (TgiMask::of_type_group(TYPE_EXEMPLAR, 0xA92A_02EA), TgiKind::ExemplarHighway),
    (TgiMask::of_type_group(TYPE_EXEMPLAR, 0xEBE0_84D1), TgiKind::ExemplarGroundHighway),
    (TgiMask::of_type_group(TYPE_EXEMPLAR, 0x6BE0_8658), TgiKind::ExemplarDirtRoad),
    (TgiMask::of_type_group(TYPE_EXEMPLAR, 0xE834_7989), TgiKind::ExemplarRail),
    (TgiMask::of_type_group(TYPE_EXEMPLAR, 0x2B79_DFFB), TgiKind::ExemplarLightRail),
    (TgiMask::of_type_group(TYPE_EXEMPLAR, 0xEBE0_84C2), TgiKind::ExemplarMonorail),
    (TgiMask::of_type_group(TYPE_EXEMPLAR, 0x088E_1962), TgiKind::ExemplarPowerPole),
    (TgiMask::of_type_group(TYPE_EXEMPLAR, 0x0A7E_9B5B), TgiKind::ExemplarT21),
    (TgiMask::of_type(TYPE_EXEMPLAR), TgiKind::Exemplar),
    (TgiMask::of_type(TYPE_COHORT), TgiKind::Cohort),
    (TgiMask::of_type(TYPE_LTEXT), TgiKind::LText),
    (TgiMask::of_type_group(TYPE_FSH, 0x1ABE_787D), TgiKind::FshMisc),
    (TgiMask::of_type_group(TYPE_FSH, 0x0986_135E), TgiKind::FshBaseOverlay),
    (TgiMask::of_type_group(TYPE_FSH, 0x2BC2_759A), TgiKind::FshShadow),
    (TgiMask::of_type_group(TYPE_FSH, 0x2A24_58F9), TgiKind::FshAnimProps),
    (TgiMask::of_type_group(TYPE_FSH, 0x49A5_93E7), TgiKind::FshAnimNonProps),
    (TgiMask::of_type_group(TYPE_FSH, 0x891B_0E1A), TgiKind::FshTerrainFoundation),
    (TgiMask::of_type_group(TYPE_FSH, 0x46A0_06B0), TgiKind::FshUi),
    (TgiMask::of_type(TYPE_FSH), TgiKind::Fsh),
    (TgiMask::of_type_group(TYPE_S3D, 0xBADB_57F1), TgiKind::S3dMaxis),
    (TgiMask::of_type(TYPE_S3D), TgiKind::S3d),
    (TgiMask::of_type_group(TYPE_SC4PATH, 0x6966_8828), TgiKind::Sc4Path2d),
    (TgiMask::of_type_group(TYPE_SC4PATH, 0xA966_883F), TgiKind::Sc4Path3d),
    (TgiMask::of_type(TYPE_SC4PATH), TgiKind::Sc4Path),
    (TgiMask::of_type_group(TYPE_PNG, 0x6A38_6D26), TgiKind::PngMenuIcon),
    (TgiMask::of_type_group(TYPE_PNG, 0x46A0_06B0), TgiKind::PngUi),
    (TgiMask::of_type(TYPE_PNG), TgiKind::Png),
    (TgiMask::of_type_group(TYPE_LUA, 0x4A5E_8F3F), TgiKind::LuaGenerator),
    (TgiMask::of_type_group(TYPE_LUA, 0x4A5E_8EF6), TgiKind::LuaAdvisor),
    (TgiMask::of_type(TYPE_LUA), TgiKind::Lua),
    (TgiMask::of_type(0x29A5_D1EC), TgiKind::Atc),
    (TgiMask::of_type(0x09AD_CD75), TgiKind::Avp),
    (TgiMask::of_type_group(0x0000_0000, 0x96A0_06B0), TgiKind::Ui),
    (TgiMask::of_type_group(0x0000_0000, 0x8A59_71C5), TgiKind::Ini),
    (TgiMask::of_type_group(0x0A5B_CF4B, 0xAA5B_CF57), TgiKind::NetworkRules),
    (TgiMask::of_type(0xEA51_18B0), TgiKind::EffectDirectory),
    (TgiMask::of_type(0xA2E3_D533), TgiKind::KeyConfig),
    (TgiMask::of_type(0x6BE7_4C60), TgiKind::LotDefinition),
    (TgiMask::BLANK, TgiKind::Unknown),
];

/// The ordered classification patterns
pub fn registry() -> &'static [(TgiMask, TgiKind)] {
    &REGISTRY
}
