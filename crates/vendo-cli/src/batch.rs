use std::path::Path;

use anyhow::{bail, Context};

use vendo_core::BinRequest;

/// Load and validate a batch file: a YAML list of bin requests, every one
/// of them still Pending.
pub fn load(path: &Path) -> anyhow::Result<Vec<BinRequest>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("could not read batch file {}", path.display()))?;
    let bins: Vec<BinRequest> =
        serde_yaml::from_str(&data).context("could not parse batch file")?;

    if bins.is_empty() {
        bail!("batch file contains no bins");
    }
    if let Some(bin) = bins.iter().find(|b| !b.is_pending()) {
        bail!(
            "bin {} is already {}; a batch must start with every bin pending",
            bin.id,
            bin.state
        );
    }
    Ok(bins)
}

/// Commented sample batch file for `vendo template`.
pub const TEMPLATE: &str = r#"# vendo batch file: one entry per bin to vend or stock.
#
# station_address picks the transport:
#   COM3            serial port
#   10.0.0.12:9100  socket
#   testrobo        simulated Robo500 unit
- id: 1
  station_id: 1
  station_name: robo
  station_address: testrobo
  virtual_code: 12a
  physical_code: 12a-01
  quantity: 1
- id: 2
  station_id: 1
  station_name: robo
  station_address: testrobo
  virtual_code: 12a
  physical_code: 12a-04
  quantity: 1
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn template_parses_as_a_valid_batch() {
        let f = write_file(TEMPLATE);
        let bins = load(f.path()).unwrap();
        assert_eq!(bins.len(), 2);
        assert!(bins.iter().all(|b| b.is_pending()));
    }

    #[test]
    fn empty_batch_is_rejected() {
        let f = write_file("[]");
        assert!(load(f.path()).is_err());
    }

    #[test]
    fn already_settled_bins_are_rejected() {
        let f = write_file(
            r#"
- id: 1
  station_id: 1
  station_name: test1
  station_address: test
  state: success
"#,
        );
        let err = load(f.path()).unwrap_err();
        assert!(err.to_string().contains("pending"));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let f = write_file("not: [valid");
        assert!(load(f.path()).is_err());
    }
}
