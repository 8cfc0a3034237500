//! Archive extraction for Docker release bundles.
//!
//! Docker ships `.tgz` bundles for Linux and macOS and `.zip` bundles for
//! Windows, but the format is decided by content rather than by file name:
//! the first 512 bytes are sniffed for the zip and gzip magic numbers, and
//! anything else is read as a plain tar stream.
//!
//! Extraction keeps file modes, directory permissions and symbolic links.
//! Directory modes are applied after every entry has been written, so a
//! read-only directory can still receive its own children. Entries with
//! absolute paths or `..` components are rejected.

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::Archive;

/// Number of leading bytes inspected to detect the archive format.
const SNIFF_LEN: usize = 512;

const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// Archive formats dvm can extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    Tar,
}

/// Classifies an archive from its leading bytes.
#[must_use]
pub fn sniff_format(header: &[u8]) -> ArchiveFormat {
    if header.starts_with(ZIP_LOCAL_HEADER) || header.starts_with(ZIP_EMPTY_ARCHIVE) {
        ArchiveFormat::Zip
    } else if header.starts_with(GZIP_MAGIC) {
        ArchiveFormat::TarGz
    } else {
        ArchiveFormat::Tar
    }
}

/// Reads the first bytes of `archive_path` and classifies it.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn detect_format(archive_path: &Path) -> Result<ArchiveFormat> {
    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;

    let mut header = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64)
        .read_to_end(&mut header)
        .with_context(|| format!("Failed to read archive: {}", archive_path.display()))?;

    Ok(sniff_format(&header))
}

/// Extracts an archive into `dest_dir`, detecting the format from its content.
///
/// # Errors
///
/// Returns an error if the archive cannot be read, is malformed, contains an
/// unsafe path, or a file cannot be written.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let format = detect_format(archive_path)?;
    tracing::debug!(archive = %archive_path.display(), ?format, "extracting");

    match format {
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir),
        ArchiveFormat::TarGz => {
            let file = open(archive_path)?;
            extract_tar_stream(GzDecoder::new(file), archive_path, dest_dir)
        }
        ArchiveFormat::Tar => extract_tar_stream(open(archive_path)?, archive_path, dest_dir),
    }
}

fn open(archive_path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))
}

/// Extracts a ZIP archive to the destination directory.
///
/// # Errors
///
/// Returns an error if the archive is not a valid ZIP file or extraction fails.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(open(archive_path)?)
        .with_context(|| format!("Failed to read ZIP archive: {}", archive_path.display()))?;

    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let mut dir_modes = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {i}"))?;

        let entry_path = entry
            .enclosed_name()
            .with_context(|| format!("Refusing to extract unsafe path: {}", entry.name()))?;
        ensure_relative(&entry_path)?;

        let output_path = dest_dir.join(&entry_path);
        let mode = entry.unix_mode();

        if entry.is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
            dir_modes.push((output_path, mode));
            continue;
        }

        create_parent(&output_path)?;

        if mode.is_some_and(is_symlink_mode) {
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .with_context(|| format!("Failed to read link target: {}", entry_path.display()))?;
            create_symlink(Path::new(&target), &output_path)?;
            continue;
        }

        let mut outfile = std::fs::File::create(&output_path)
            .with_context(|| format!("Failed to create file: {}", output_path.display()))?;
        std::io::copy(&mut entry, &mut outfile)
            .with_context(|| format!("Failed to extract: {}", output_path.display()))?;
        drop(outfile);

        apply_mode(&output_path, mode)?;
    }

    apply_dir_modes(dir_modes)
}

/// Extracts a tar stream (compressed or not) to the destination directory.
fn extract_tar_stream<R: Read>(reader: R, archive_path: &Path, dest_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let mut dir_modes = Vec::new();
    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
    {
        let mut entry = entry
            .with_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;

        let entry_path = entry
            .path()
            .context("Failed to get entry path")?
            .into_owned();
        ensure_relative(&entry_path)?;

        let output_path = dest_dir.join(&entry_path);
        if entry.header().entry_type().is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
            dir_modes.push((output_path, entry.header().mode().ok()));
            continue;
        }
        create_parent(&output_path)?;

        entry
            .unpack(&output_path)
            .with_context(|| format!("Failed to extract: {}", output_path.display()))?;
    }

    apply_dir_modes(dir_modes)
}

/// Applies stored directory modes, deepest directories first.
fn apply_dir_modes(mut dir_modes: Vec<(PathBuf, Option<u32>)>) -> Result<()> {
    dir_modes.sort_by(|(a, _), (b, _)| b.components().count().cmp(&a.components().count()));
    for (dir, mode) in dir_modes {
        apply_mode(&dir, mode)?;
    }
    Ok(())
}

/// Rejects absolute paths and paths that climb out of the extraction root.
fn ensure_relative(entry_path: &Path) -> Result<()> {
    if entry_path.is_absolute()
        || entry_path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        bail!(
            "Refusing to extract path with parent directory or absolute reference: {}",
            entry_path.display()
        );
    }
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn is_symlink_mode(mode: u32) -> bool {
    mode & 0o170_000 == 0o120_000
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
            .with_context(|| format!("Failed to set permissions: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)
        .with_context(|| format!("Failed to create symlink: {}", link.display()))
}

#[cfg(not(unix))]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    let resolved = link.parent().map_or_else(|| target.to_path_buf(), |p| p.join(target));
    std::fs::copy(&resolved, link)
        .map(|_| ())
        .with_context(|| format!("Failed to copy link target: {}", resolved.display()))
}

/// Marks a single file as executable (0o755). No-op on Windows.
///
/// # Errors
///
/// Returns an error if the permissions cannot be changed.
#[cfg(unix)]
pub fn set_executable_permissions(path: &Path) -> Result<()> {
    apply_mode(path, Some(0o755))
}

/// Marks a single file as executable (0o755). No-op on Windows.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
pub fn set_executable_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tar::{Builder, EntryType, Header};

    fn append_file<W: Write>(builder: &mut Builder<W>, path: &str, data: &[u8], mode: u32) {
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        builder
            .append_data(&mut header, path, data)
            .expect("Should append file");
    }

    fn append_dir<W: Write>(builder: &mut Builder<W>, path: &str, mode: u32) {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Directory);
        header.set_size(0);
        header.set_mode(mode);
        header.set_cksum();
        builder
            .append_data(&mut header, path, std::io::empty())
            .expect("Should append dir");
    }

    /// Builds a tarball shaped like Docker's static bundles.
    fn create_docker_tgz(archive_path: &Path) {
        let file = std::fs::File::create(archive_path).expect("Should create file");
        let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));

        append_dir(&mut builder, "docker/", 0o755);
        append_file(&mut builder, "docker/docker", b"#!/bin/sh\necho docker\n", 0o755);
        append_file(&mut builder, "docker/README", b"readme", 0o644);

        builder
            .into_inner()
            .expect("Should finish tar")
            .finish()
            .expect("Should finish gzip");
    }

    #[test]
    fn sniff_format_recognizes_magic_numbers() {
        assert_eq!(sniff_format(b"PK\x03\x04rest"), ArchiveFormat::Zip);
        assert_eq!(sniff_format(b"PK\x05\x06"), ArchiveFormat::Zip);
        assert_eq!(sniff_format(&[0x1f, 0x8b, 0x08, 0x00]), ArchiveFormat::TarGz);
        assert_eq!(sniff_format(b"docker/docker\0\0\0"), ArchiveFormat::Tar);
        assert_eq!(sniff_format(b""), ArchiveFormat::Tar);
    }

    #[test]
    fn detect_format_ignores_file_extension() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("docker-17.06.0-ce.tgz");
        {
            let file = std::fs::File::create(&archive_path).expect("Should create file");
            let mut zip = zip::ZipWriter::new(file);
            zip.start_file("docker/docker.exe", zip::write::SimpleFileOptions::default())
                .expect("Should start file");
            zip.write_all(b"binary").expect("Should write");
            zip.finish().expect("Should finish");
        }

        assert_eq!(
            detect_format(&archive_path).expect("Should detect"),
            ArchiveFormat::Zip
        );
    }

    #[test]
    fn extract_tar_gz_keeps_layout() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("docker.tgz");
        let dest = temp.path().join("out");
        create_docker_tgz(&archive_path);

        extract_archive(&archive_path, &dest).expect("Should extract");

        assert_eq!(
            std::fs::read(dest.join("docker").join("docker")).expect("Should read"),
            b"#!/bin/sh\necho docker\n"
        );
        assert!(dest.join("docker").join("README").exists());
    }

    #[test]
    fn extract_plain_tar() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("docker.tar");
        let dest = temp.path().join("out");
        {
            let file = std::fs::File::create(&archive_path).expect("Should create file");
            let mut builder = Builder::new(file);
            append_file(&mut builder, "docker/docker", b"binary", 0o755);
            builder.finish().expect("Should finish");
        }

        assert_eq!(
            detect_format(&archive_path).expect("Should detect"),
            ArchiveFormat::Tar
        );
        extract_archive(&archive_path, &dest).expect("Should extract");
        assert!(dest.join("docker").join("docker").exists());
    }

    #[test]
    fn extract_zip_keeps_layout() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("docker.zip");
        let dest = temp.path().join("out");
        {
            let file = std::fs::File::create(&archive_path).expect("Should create file");
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
            zip.add_directory("docker/", options)
                .expect("Should add directory");
            zip.start_file("docker/docker.exe", options)
                .expect("Should start file");
            zip.write_all(b"binary").expect("Should write");
            zip.finish().expect("Should finish");
        }

        extract_archive(&archive_path, &dest).expect("Should extract");
        assert_eq!(
            std::fs::read(dest.join("docker").join("docker.exe")).expect("Should read"),
            b"binary"
        );
    }

    #[test]
    fn rejects_parent_directory_entries() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("evil.tar");
        {
            let file = std::fs::File::create(&archive_path).expect("Should create file");
            let mut builder = Builder::new(file);
            let mut header = Header::new_old();
            let name = b"../evil";
            header.as_old_mut().name[..name.len()].copy_from_slice(name);
            header.set_size(4);
            header.set_mode(0o644);
            header.set_entry_type(EntryType::Regular);
            header.set_cksum();
            builder
                .append(&header, b"evil".as_slice())
                .expect("Should append");
            builder.finish().expect("Should finish");
        }

        let dest = temp.path().join("out");
        let err = extract_archive(&archive_path, &dest).expect_err("Should reject");
        assert!(err.to_string().contains("Refusing to extract"));
        assert!(!temp.path().join("evil").exists());
    }

    #[test]
    fn corrupt_gzip_fails() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("docker.tgz");
        std::fs::write(&archive_path, [0x1f, 0x8b, 0x00, 0x01, 0x02]).expect("Should write");

        assert!(extract_archive(&archive_path, &temp.path().join("out")).is_err());
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        #[test]
        fn tar_gz_preserves_file_modes() {
            let temp = tempfile::tempdir().expect("Should create temp dir");
            let archive_path = temp.path().join("docker.tgz");
            let dest = temp.path().join("out");
            create_docker_tgz(&archive_path);

            extract_archive(&archive_path, &dest).expect("Should extract");

            let binary = std::fs::metadata(dest.join("docker").join("docker"))
                .expect("Should stat binary");
            assert_eq!(binary.permissions().mode() & 0o777, 0o755);
            let readme = std::fs::metadata(dest.join("docker").join("README"))
                .expect("Should stat readme");
            assert_eq!(readme.permissions().mode() & 0o777, 0o644);
        }

        #[test]
        fn tar_gz_preserves_symlinks() {
            let temp = tempfile::tempdir().expect("Should create temp dir");
            let archive_path = temp.path().join("docker.tgz");
            let dest = temp.path().join("out");
            {
                let file = std::fs::File::create(&archive_path).expect("Should create file");
                let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
                append_file(&mut builder, "docker/docker", b"binary", 0o755);

                let mut header = Header::new_gnu();
                header.set_entry_type(EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                header
                    .set_link_name("docker")
                    .expect("Should set link name");
                header.set_cksum();
                builder
                    .append_data(&mut header, "docker/docker-latest", std::io::empty())
                    .expect("Should append link");

                builder
                    .into_inner()
                    .expect("Should finish tar")
                    .finish()
                    .expect("Should finish gzip");
            }

            extract_archive(&archive_path, &dest).expect("Should extract");

            let link = dest.join("docker").join("docker-latest");
            let meta = std::fs::symlink_metadata(&link).expect("Should stat link");
            assert!(meta.file_type().is_symlink());
            assert_eq!(
                std::fs::read_link(&link).expect("Should read link"),
                Path::new("docker")
            );
        }

        #[test]
        fn zip_preserves_file_modes() {
            let temp = tempfile::tempdir().expect("Should create temp dir");
            let archive_path = temp.path().join("docker.zip");
            let dest = temp.path().join("out");
            {
                let file = std::fs::File::create(&archive_path).expect("Should create file");
                let mut zip = zip::ZipWriter::new(file);
                let options = zip::write::SimpleFileOptions::default().unix_permissions(0o750);
                zip.start_file("docker/docker", options)
                    .expect("Should start file");
                zip.write_all(b"binary").expect("Should write");
                zip.finish().expect("Should finish");
            }

            extract_zip(&archive_path, &dest).expect("Should extract");

            let meta = std::fs::metadata(dest.join("docker").join("docker"))
                .expect("Should stat binary");
            assert_eq!(meta.permissions().mode() & 0o777, 0o750);
        }

        #[test]
        fn read_only_directory_still_receives_children() {
            let temp = tempfile::tempdir().expect("Should create temp dir");
            let archive_path = temp.path().join("docker.tgz");
            let dest = temp.path().join("out");
            {
                let file = std::fs::File::create(&archive_path).expect("Should create file");
                let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
                append_dir(&mut builder, "docker/", 0o555);
                append_file(&mut builder, "docker/docker", b"binary", 0o755);
                builder
                    .into_inner()
                    .expect("Should finish tar")
                    .finish()
                    .expect("Should finish gzip");
            }

            extract_archive(&archive_path, &dest).expect("Should extract");

            let dir = dest.join("docker");
            assert!(dir.join("docker").is_file());
            let meta = std::fs::metadata(&dir).expect("Should stat dir");
            assert_eq!(meta.permissions().mode() & 0o777, 0o555);

            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755))
                .expect("Should restore permissions");
        }

        #[test]
        fn set_executable_permissions_sets_755() {
            let temp = tempfile::tempdir().expect("Should create temp dir");
            let path = temp.path().join("docker");
            std::fs::write(&path, b"binary").expect("Should write");

            set_executable_permissions(&path).expect("Should chmod");

            let meta = std::fs::metadata(&path).expect("Should stat");
            assert_eq!(meta.permissions().mode() & 0o777, 0o755);
        }
    }
}
