//! Subsystem assembly
//!
//! Turns what the user picked (one content path, or a subsystem plus a list
//! of roms) into per-slot content specs carrying the attributes the core
//! declared for each slot.

use rh_core::error::SubsystemError;
use rh_ffi::{CoreDeclarations, SubsystemDescriptor, SubsystemRom, SystemInfo};
use std::path::PathBuf;
use tracing::debug;

/// How the core wants one content slot delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentAttributes {
    /// The core opens the file itself; content is never read into memory
    pub need_fullpath: bool,
    /// Archive members are handed over as-is instead of being extracted
    pub block_extract: bool,
    /// Loading fails if the slot has no path
    pub required: bool,
}

/// One slot to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSpec {
    /// `None` for a deliberately empty slot
    pub path: Option<PathBuf>,
    pub attributes: ContentAttributes,
    /// Extensions the core accepts for this slot, lowercase
    pub valid_extensions: Vec<String>,
}

impl ContentSpec {
    fn for_rom(path: PathBuf, rom: &SubsystemRom) -> Self {
        Self {
            path: non_empty(path),
            attributes: ContentAttributes {
                need_fullpath: rom.need_fullpath,
                block_extract: rom.block_extract,
                required: rom.required,
            },
            valid_extensions: rom.valid_extensions.clone(),
        }
    }
}

fn non_empty(path: PathBuf) -> Option<PathBuf> {
    (!path.as_os_str().is_empty()).then_some(path)
}

/// What the user asked to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSelection {
    /// A single content path; `None` asks for a contentless start
    Plain { content: Option<PathBuf> },
    /// A subsystem by identifier with its roms in slot order
    Subsystem { ident: String, roms: Vec<PathBuf> },
}

impl ContentSelection {
    pub fn plain(content: impl Into<PathBuf>) -> Self {
        Self::Plain {
            content: non_empty(content.into()),
        }
    }

    pub fn contentless() -> Self {
        Self::Plain { content: None }
    }

    pub fn is_subsystem(&self) -> bool {
        matches!(self, Self::Subsystem { .. })
    }
}

/// Ordered content specs plus the subsystem they belong to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub specs: Vec<ContentSpec>,
    /// `None` in plain mode
    pub subsystem: Option<SubsystemDescriptor>,
}

/// Build the content specs for `selection`
pub fn assemble(
    selection: &ContentSelection,
    system_info: &SystemInfo,
    declarations: &CoreDeclarations,
) -> Result<Assembly, SubsystemError> {
    match selection {
        ContentSelection::Plain { content } => {
            // Without content the slot is only required if the core needs a game.
            let spec = ContentSpec {
                path: content.clone(),
                attributes: ContentAttributes {
                    need_fullpath: system_info.need_fullpath,
                    block_extract: system_info.block_extract,
                    required: !declarations.supports_no_game,
                },
                valid_extensions: system_info.valid_extensions.clone(),
            };
            Ok(Assembly {
                specs: vec![spec],
                subsystem: None,
            })
        }
        ContentSelection::Subsystem { ident, roms } => {
            let subsystem = declarations
                .subsystems
                .iter()
                .find(|subsystem| subsystem.ident == *ident)
                .ok_or_else(|| SubsystemError::Unknown(ident.clone()))?;

            let expected = subsystem.num_roms();
            let supplied = roms.len();
            if expected == 0 && supplied > 0 {
                return Err(SubsystemError::TakesNoContent {
                    ident: ident.clone(),
                    supplied,
                });
            }
            if expected > 0 && supplied == 0 {
                return Err(SubsystemError::RequiresContent {
                    ident: ident.clone(),
                    expected,
                });
            }
            if expected != supplied {
                return Err(SubsystemError::CountMismatch {
                    ident: ident.clone(),
                    expected,
                    supplied,
                });
            }

            debug!("Assembling subsystem {} with {} roms", subsystem.ident, supplied);
            let specs = roms
                .iter()
                .zip(&subsystem.roms)
                .map(|(path, rom)| ContentSpec::for_rom(path.clone(), rom))
                .collect();

            Ok(Assembly {
                specs,
                subsystem: Some(subsystem.clone()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom(required: bool, need_fullpath: bool) -> SubsystemRom {
        SubsystemRom {
            desc: "Cartridge".to_string(),
            valid_extensions: vec!["st".to_string()],
            need_fullpath,
            block_extract: false,
            required,
            memory: Vec::new(),
        }
    }

    fn declarations() -> CoreDeclarations {
        CoreDeclarations {
            subsystems: vec![
                SubsystemDescriptor {
                    ident: "sufami_turbo".to_string(),
                    desc: "Sufami Turbo".to_string(),
                    id: 1,
                    roms: vec![rom(true, false), rom(false, true)],
                },
                SubsystemDescriptor {
                    ident: "bios_only".to_string(),
                    desc: "BIOS".to_string(),
                    id: 2,
                    roms: Vec::new(),
                },
            ],
            has_set_subsystems: true,
            ..CoreDeclarations::default()
        }
    }

    fn subsystem(ident: &str, roms: &[&str]) -> ContentSelection {
        ContentSelection::Subsystem {
            ident: ident.to_string(),
            roms: roms.iter().map(PathBuf::from).collect(),
        }
    }

    #[test]
    fn test_plain_selection_uses_system_info() {
        let info = SystemInfo {
            need_fullpath: true,
            valid_extensions: vec!["sfc".to_string()],
            ..SystemInfo::default()
        };
        let assembly = assemble(
            &ContentSelection::plain("/roms/game.sfc"),
            &info,
            &CoreDeclarations::default(),
        )
        .unwrap();

        assert!(assembly.subsystem.is_none());
        assert_eq!(assembly.specs.len(), 1);
        let spec = &assembly.specs[0];
        assert_eq!(spec.path, Some(PathBuf::from("/roms/game.sfc")));
        assert!(spec.attributes.need_fullpath);
        assert!(spec.attributes.required);
        assert_eq!(spec.valid_extensions, vec!["sfc".to_string()]);
    }

    #[test]
    fn test_contentless_slot_optional_when_core_allows() {
        let declarations = CoreDeclarations {
            supports_no_game: true,
            ..CoreDeclarations::default()
        };
        let assembly = assemble(
            &ContentSelection::plain(""),
            &SystemInfo::default(),
            &declarations,
        )
        .unwrap();

        assert_eq!(assembly.specs[0].path, None);
        assert!(!assembly.specs[0].attributes.required);
    }

    #[test]
    fn test_subsystem_attributes_per_slot() {
        let assembly = assemble(
            &subsystem("sufami_turbo", &["a.st", "b.st"]),
            &SystemInfo::default(),
            &declarations(),
        )
        .unwrap();

        assert_eq!(assembly.subsystem.as_ref().map(|s| s.id), Some(1));
        assert!(assembly.specs[0].attributes.required);
        assert!(!assembly.specs[0].attributes.need_fullpath);
        assert!(!assembly.specs[1].attributes.required);
        assert!(assembly.specs[1].attributes.need_fullpath);
    }

    #[test]
    fn test_count_mismatch_both_directions() {
        for roms in [&["a.st"][..], &["a.st", "b.st", "c.st"][..]] {
            let err = assemble(
                &subsystem("sufami_turbo", roms),
                &SystemInfo::default(),
                &declarations(),
            )
            .unwrap_err();
            assert!(matches!(err, SubsystemError::CountMismatch { expected: 2, .. }));
        }
    }

    #[test]
    fn test_missing_and_extra_roms() {
        let err = assemble(
            &subsystem("sufami_turbo", &[]),
            &SystemInfo::default(),
            &declarations(),
        )
        .unwrap_err();
        assert!(matches!(err, SubsystemError::RequiresContent { expected: 2, .. }));

        let err = assemble(
            &subsystem("bios_only", &["x.bin"]),
            &SystemInfo::default(),
            &declarations(),
        )
        .unwrap_err();
        assert!(matches!(err, SubsystemError::TakesNoContent { supplied: 1, .. }));

        let assembly = assemble(
            &subsystem("bios_only", &[]),
            &SystemInfo::default(),
            &declarations(),
        )
        .unwrap();
        assert!(assembly.specs.is_empty());
    }

    #[test]
    fn test_unknown_subsystem() {
        let err = assemble(
            &subsystem("satellaview", &["a.bs"]),
            &SystemInfo::default(),
            &declarations(),
        )
        .unwrap_err();
        assert!(matches!(err, SubsystemError::Unknown(ref ident) if ident == "satellaview"));
    }
}
