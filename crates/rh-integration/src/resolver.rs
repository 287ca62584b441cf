//! Content resolution
//!
//! Turns one content spec into what the core receives. In order:
//! - Archive members are extracted into the cache directory (unless the core
//!   blocks extraction)
//! - The first plain item, when loaded into memory, is soft-patched
//! - The first item's CRC is computed now if patched, otherwise deferred
//! - Full-path content outside the sandbox is copied into the cache

use crate::subsystem::ContentSpec;
use crate::temporary::TemporaryContent;
use rh_core::error::ContentReadError;
use rh_core::Result;
use rh_ffi::{extension_in, GameInfo};
use rh_loader::{apply_patch, crc32, AppliedPatch, PatchSettings};
use rh_vfs::{copy_to_cache, Archive, ContentKind, ContentPath, SandboxPolicy};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the identifying CRC of the first item comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrcSource {
    /// Hashed the patched buffer already
    Computed(u32),
    /// Hash this content the first time the CRC is asked for
    Deferred(ContentPath),
}

/// One item as handed to the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedItem {
    /// The content path after archive member selection; `None` for an empty slot
    pub source: Option<ContentPath>,
    /// Path given to the core
    pub path: Option<PathBuf>,
    /// Bytes passed in memory, zero for full-path content
    pub size: usize,
    pub kind: ContentKind,
    pub extracted: bool,
    pub copied: bool,
    pub patch: Option<AppliedPatch>,
}

impl LoadedItem {
    fn empty() -> Self {
        Self {
            source: None,
            path: None,
            size: 0,
            kind: ContentKind::Contentless,
            extracted: false,
            copied: false,
            patch: None,
        }
    }
}

/// A resolved slot
#[derive(Debug)]
pub struct ResolvedContent {
    pub item: LoadedItem,
    pub game: GameInfo,
    /// Only set for the first slot
    pub crc: Option<CrcSource>,
}

/// Settings shared by every slot of one load
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    pub cache_dir: &'a Path,
    pub sandbox: &'a SandboxPolicy,
    pub patches: &'a PatchSettings,
    /// The core reads files through the frontend VFS
    pub core_supports_vfs: bool,
}

fn read_error(path: &Path, source: io::Error) -> ContentReadError {
    ContentReadError::Read {
        path: path.to_path_buf(),
        source,
    }
}

fn accepts(spec: &ContentSpec, content: &ContentPath) -> bool {
    content
        .extension()
        .is_some_and(|ext| extension_in(&spec.valid_extensions, &ext))
}

impl<'a> Resolver<'a> {
    /// Resolve the spec for `slot`; files created on the way are tracked in `temporary`
    pub fn resolve(
        &self,
        spec: &ContentSpec,
        slot: usize,
        subsystem_mode: bool,
        temporary: &mut TemporaryContent,
    ) -> Result<ResolvedContent> {
        let Some(raw) = spec.path.as_deref() else {
            debug!("Slot {} is empty", slot);
            return Ok(ResolvedContent {
                item: LoadedItem::empty(),
                game: GameInfo::default(),
                crc: None,
            });
        };

        let mut content = ContentPath::from_path(raw);
        if content.is_bare_archive() && !accepts(spec, &content) {
            let member = Archive::open(content.outer_file())?.find_member(&spec.valid_extensions)?;
            debug!("Using {} from {}", member, content);
            content = ContentPath::ArchiveMember {
                archive: content.outer_file().to_path_buf(),
                member,
            };
        }

        let kind = ContentKind::detect(Some(&content));
        let attributes = spec.attributes;
        let first = slot == 0;
        let mut item = LoadedItem {
            kind,
            ..LoadedItem::empty()
        };

        let mut data = None;
        let mut path = match &content {
            ContentPath::File(file) => file.clone(),
            ContentPath::ArchiveMember { archive, member } if !attributes.block_extract => {
                let dest_dir = temporary.slot_dir(self.cache_dir, slot);
                let extracted = Archive::open(archive)?.extract_member(member, &dest_dir)?;
                temporary.track(extracted.clone());
                item.extracted = true;
                extracted
            }
            ContentPath::ArchiveMember { archive, member } => {
                if !attributes.need_fullpath {
                    data = Some(Archive::open(archive)?.read_member(member)?);
                }
                content.to_path_buf()
            }
        };

        let mut crc = None;
        if attributes.need_fullpath {
            let outer = content.outer_file();
            if !item.extracted && !outer.exists() {
                return Err(read_error(outer, io::ErrorKind::NotFound.into()).into());
            }
            if !item.extracted && self.sandbox.needs_copy(outer, self.core_supports_vfs) {
                let dest_dir = temporary.slot_dir(self.cache_dir, slot);
                let copy = copy_to_cache(outer, &dest_dir)?;
                temporary.track(copy.clone());
                path = match &content {
                    ContentPath::File(_) => copy,
                    ContentPath::ArchiveMember { member, .. } => ContentPath::ArchiveMember {
                        archive: copy,
                        member: member.clone(),
                    }
                    .to_path_buf(),
                };
                item.copied = true;
            }
        } else {
            let mut buffer = match data {
                Some(buffer) => buffer,
                None => fs::read(&path).map_err(|e| read_error(&path, e))?,
            };
            if first && !subsystem_mode && !kind.is_media() {
                item.patch = apply_patch(self.patches, content.outer_file(), &mut buffer)?;
                if item.patch.is_some() {
                    crc = Some(CrcSource::Computed(crc32(&buffer)));
                }
            }
            item.size = buffer.len();
            data = Some(buffer);
        }

        if first && crc.is_none() && !kind.is_media() {
            crc = Some(CrcSource::Deferred(content.clone()));
        }

        debug!(
            "Resolved slot {} to {} ({} bytes in memory, extracted: {}, copied: {})",
            slot,
            path.display(),
            item.size,
            item.extracted,
            item.copied
        );

        item.source = Some(content);
        item.path = Some(path.clone());
        Ok(ResolvedContent {
            item,
            game: GameInfo {
                path: Some(path),
                data,
                meta: None,
            },
            crc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystem::ContentAttributes;
    use rh_core::config::SandboxConfig;
    use rh_core::error::ExtractionError;
    use rh_core::RuntimeError;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        cache: PathBuf,
        sandbox: SandboxPolicy,
        patches: PatchSettings,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let cache = dir.path().join("cache");
            Self {
                dir,
                cache,
                sandbox: SandboxPolicy::disabled(),
                patches: PatchSettings::default(),
            }
        }

        fn resolver(&self) -> Resolver<'_> {
            Resolver {
                cache_dir: &self.cache,
                sandbox: &self.sandbox,
                patches: &self.patches,
                core_supports_vfs: false,
            }
        }

        fn write(&self, name: &str, data: &[u8]) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, data).unwrap();
            path
        }

        fn write_zip(&self, name: &str, members: &[(&str, &[u8])]) -> PathBuf {
            let path = self.dir.path().join(name);
            let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
            for (member, data) in members {
                zip.start_file(*member, zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(data).unwrap();
            }
            zip.finish().unwrap();
            path
        }
    }

    fn spec(path: &Path, attributes: ContentAttributes) -> ContentSpec {
        ContentSpec {
            path: Some(path.to_path_buf()),
            attributes,
            valid_extensions: vec!["bin".to_string(), "cue".to_string()],
        }
    }

    fn in_memory() -> ContentAttributes {
        ContentAttributes::default()
    }

    fn full_path() -> ContentAttributes {
        ContentAttributes {
            need_fullpath: true,
            ..ContentAttributes::default()
        }
    }

    #[test]
    fn test_plain_file_read_into_memory() {
        let fixture = Fixture::new();
        let rom = fixture.write("game.bin", b"cartridge");
        let mut temporary = TemporaryContent::new();

        let resolved = fixture
            .resolver()
            .resolve(&spec(&rom, in_memory()), 0, false, &mut temporary)
            .unwrap();

        assert_eq!(resolved.game.data.as_deref(), Some(&b"cartridge"[..]));
        assert_eq!(resolved.item.size, 9);
        assert_eq!(
            resolved.crc,
            Some(CrcSource::Deferred(ContentPath::File(rom.clone())))
        );
        assert!(temporary.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let fixture = Fixture::new();
        let missing = fixture.dir.path().join("missing.bin");
        let mut temporary = TemporaryContent::new();

        for attributes in [in_memory(), full_path()] {
            let err = fixture
                .resolver()
                .resolve(&spec(&missing, attributes), 0, false, &mut temporary)
                .unwrap_err();
            assert!(matches!(err, RuntimeError::ContentRead(ContentReadError::Read { .. })));
        }
    }

    #[test]
    fn test_bare_archive_extracts_matching_member() {
        let fixture = Fixture::new();
        let archive = fixture.write_zip("pack.zip", &[("readme.txt", b"hi"), ("roms/game.bin", b"data")]);
        let mut temporary = TemporaryContent::new();

        let resolved = fixture
            .resolver()
            .resolve(&spec(&archive, full_path()), 0, false, &mut temporary)
            .unwrap();

        let extracted = fixture.cache.join("game.bin");
        assert_eq!(resolved.game.path.as_deref(), Some(extracted.as_path()));
        assert!(resolved.game.data.is_none());
        assert!(resolved.item.extracted);
        assert_eq!(temporary.paths(), &[extracted.clone()]);
        assert_eq!(fs::read(&extracted).unwrap(), b"data");
        assert_eq!(
            resolved.crc,
            Some(CrcSource::Deferred(ContentPath::ArchiveMember {
                archive,
                member: "roms/game.bin".to_string(),
            }))
        );
    }

    #[test]
    fn test_block_extract_reads_member_directly() {
        let fixture = Fixture::new();
        let archive = fixture.write_zip("pack.zip", &[("game.bin", b"data")]);
        let mut temporary = TemporaryContent::new();
        let attributes = ContentAttributes {
            block_extract: true,
            ..ContentAttributes::default()
        };
        let raw = PathBuf::from(format!("{}#game.bin", archive.display()));

        let resolved = fixture
            .resolver()
            .resolve(&spec(&raw, attributes), 0, false, &mut temporary)
            .unwrap();

        assert_eq!(resolved.game.data.as_deref(), Some(&b"data"[..]));
        assert_eq!(resolved.game.path, Some(raw));
        assert!(!resolved.item.extracted);
        assert!(temporary.is_empty());
    }

    #[test]
    fn test_archive_without_match() {
        let fixture = Fixture::new();
        let archive = fixture.write_zip("pack.zip", &[("readme.txt", b"hi")]);
        let mut temporary = TemporaryContent::new();

        let err = fixture
            .resolver()
            .resolve(&spec(&archive, in_memory()), 0, false, &mut temporary)
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Extraction(ExtractionError::NoMatchingMember { .. })
        ));
    }

    #[test]
    fn test_patch_applies_to_first_plain_item_only() {
        let fixture = Fixture::new();
        let rom = fixture.write("game.bin", b"AAAA");
        fixture.write("game.ips", b"PATCH\x00\x00\x01\x00\x02ZZEOF");
        let mut temporary = TemporaryContent::new();
        let resolver = fixture.resolver();

        let patched = resolver
            .resolve(&spec(&rom, in_memory()), 0, false, &mut temporary)
            .unwrap();
        assert_eq!(patched.game.data.as_deref(), Some(&b"AZZA"[..]));
        assert_eq!(patched.crc, Some(CrcSource::Computed(crc32(b"AZZA"))));
        assert!(patched.item.patch.is_some());

        let second = resolver
            .resolve(&spec(&rom, in_memory()), 1, false, &mut temporary)
            .unwrap();
        assert_eq!(second.game.data.as_deref(), Some(&b"AAAA"[..]));
        assert!(second.crc.is_none());

        let subsystem = resolver
            .resolve(&spec(&rom, in_memory()), 0, true, &mut temporary)
            .unwrap();
        assert_eq!(subsystem.game.data.as_deref(), Some(&b"AAAA"[..]));
        assert!(subsystem.item.patch.is_none());
    }

    #[test]
    fn test_media_skips_crc() {
        let fixture = Fixture::new();
        let movie = fixture.write("intro.mp4", b"frames");
        let mut temporary = TemporaryContent::new();

        let resolved = fixture
            .resolver()
            .resolve(&spec(&movie, full_path()), 0, false, &mut temporary)
            .unwrap();
        assert!(resolved.crc.is_none());
        assert!(resolved.item.kind.is_media());
    }

    #[test]
    fn test_sandbox_copy() {
        let mut fixture = Fixture::new();
        let rom = fixture.write("game.bin", b"cartridge");
        fixture.sandbox = SandboxPolicy::new(
            &SandboxConfig {
                enabled: true,
                accessible_dirs: Vec::new(),
            },
            &fixture.cache,
        );
        let mut temporary = TemporaryContent::new();

        let resolved = fixture
            .resolver()
            .resolve(&spec(&rom, full_path()), 0, false, &mut temporary)
            .unwrap();
        let copy = fixture.cache.join("game.bin");
        assert!(resolved.item.copied);
        assert_eq!(resolved.game.path.as_deref(), Some(copy.as_path()));
        assert!(temporary.contains(&copy));

        let vfs = Resolver {
            core_supports_vfs: true,
            ..fixture.resolver()
        };
        let direct = vfs
            .resolve(&spec(&rom, full_path()), 0, false, &mut temporary)
            .unwrap();
        assert!(!direct.item.copied);
        assert_eq!(direct.game.path, Some(rom));
    }

    #[test]
    fn test_empty_slot() {
        let fixture = Fixture::new();
        let mut temporary = TemporaryContent::new();
        let empty = ContentSpec {
            path: None,
            attributes: in_memory(),
            valid_extensions: Vec::new(),
        };

        let resolved = fixture
            .resolver()
            .resolve(&empty, 0, false, &mut temporary)
            .unwrap();
        assert!(resolved.game.is_empty());
        assert_eq!(resolved.item.kind, ContentKind::Contentless);
        assert!(resolved.crc.is_none());
    }
}
