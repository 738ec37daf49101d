use std::{
    fs::File,
    io::{self, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;

/// Writes a value as pretty JSON to a file, or to stdout when no path is
/// given.
pub fn save_json<T>(value: &T, output_path: Option<&PathBuf>) -> anyhow::Result<()>
where
    T: serde::Serialize,
{
    match output_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)
                .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
            writeln!(writer)?;
            writer
                .flush()
                .with_context(|| format!("Failed to flush output to {}", path.display()))?;
        }
        None => {
            let mut writer = io::stdout().lock();
            serde_json::to_writer_pretty(&mut writer, value)
                .context("Failed to write JSON to stdout")?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

/// Reads and deserializes a JSON file, naming the file kind in errors.
pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;
    let reader = io::BufReader::new(file);
    serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })
}
