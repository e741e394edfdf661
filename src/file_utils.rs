use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

// @module: File and directory utilities

// Characters rejected in file names on at least one common platform
const INVALID_FILE_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @returns: `name` with every character invalid in a file name replaced by `_`
    pub fn sanitize_file_name(name: &str) -> String {
        let sanitized: String = name
            .chars()
            .map(|c| {
                if INVALID_FILE_NAME_CHARS.contains(&c) || c.is_control() {
                    '_'
                } else {
                    c
                }
            })
            .collect();

        // A name made only of dots would resolve to a directory
        if sanitized.chars().all(|c| c == '.') {
            sanitized.replace('.', "_")
        } else {
            sanitized
        }
    }

    // @generates: Output path for an exported artifact
    pub fn generate_output_path<P: AsRef<Path>>(output_dir: P, file_name: &str) -> PathBuf {
        output_dir.as_ref().join(Self::sanitize_file_name(file_name))
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Write a string to a file that must not exist yet unless `overwrite`
    pub fn write_new_file<P: AsRef<Path>>(path: P, content: &str, overwrite: bool) -> Result<()> {
        let path = path.as_ref();
        if !overwrite && path.exists() {
            return Err(anyhow!(
                "Output file already exists: {:?} (use --force to overwrite)",
                path
            ));
        }
        Self::write_to_file(path, content)
    }
}
