//! Load request built by the command line front end

use crate::subsystem::ContentSelection;
use rh_loader::PatchSettings;
use std::path::PathBuf;

/// Pre-parsed command line request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MainWrap {
    /// Core library to open
    pub core: PathBuf,
    /// Primary content; ignored when a subsystem is given
    pub content: Option<PathBuf>,
    pub subsystem: Option<String>,
    pub subsystem_roms: Vec<PathBuf>,
    pub no_patch: bool,
    pub ips: Option<PathBuf>,
    pub bps: Option<PathBuf>,
    pub ups: Option<PathBuf>,
}

impl MainWrap {
    pub fn new(core: impl Into<PathBuf>) -> Self {
        Self {
            core: core.into(),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<PathBuf>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_subsystem(mut self, ident: impl Into<String>, roms: Vec<PathBuf>) -> Self {
        self.subsystem = Some(ident.into());
        self.subsystem_roms = roms;
        self
    }

    /// What to load
    pub fn selection(&self) -> ContentSelection {
        match &self.subsystem {
            Some(ident) => ContentSelection::Subsystem {
                ident: ident.clone(),
                roms: self.subsystem_roms.clone(),
            },
            None => match &self.content {
                Some(content) => ContentSelection::plain(content.clone()),
                None => ContentSelection::contentless(),
            },
        }
    }

    /// Patch settings for this request; `enabled` is the configured default
    pub fn patch_settings(&self, enabled: bool) -> PatchSettings {
        PatchSettings {
            enabled: enabled && !self.no_patch,
            ips: self.ips.clone(),
            bps: self.bps.clone(),
            ups: self.ups.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_selection() {
        let wrap = MainWrap::new("/cores/snes.so").with_content("/roms/game.sfc");
        assert_eq!(wrap.selection(), ContentSelection::plain("/roms/game.sfc"));
        assert_eq!(MainWrap::new("core.so").selection(), ContentSelection::contentless());
    }

    #[test]
    fn test_subsystem_selection() {
        let wrap = MainWrap::new("core.so")
            .with_content("ignored.sfc")
            .with_subsystem("sufami_turbo", vec![PathBuf::from("a.st"), PathBuf::from("b.st")]);
        assert!(wrap.selection().is_subsystem());
    }

    #[test]
    fn test_patch_settings() {
        let mut wrap = MainWrap::new("core.so");
        wrap.ups = Some(PathBuf::from("fix.ups"));
        let settings = wrap.patch_settings(true);
        assert!(settings.enabled);
        assert_eq!(settings.ups, Some(PathBuf::from("fix.ups")));

        wrap.no_patch = true;
        assert!(!wrap.patch_settings(true).enabled);
        assert!(!MainWrap::new("core.so").patch_settings(false).enabled);
    }
}
