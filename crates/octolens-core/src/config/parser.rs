//! TOML parser with helpful error messages

use std::path::Path;

use anyhow::{Context, Result};

use super::schema::OctolensConfig;

/// Parse octolens.toml with detailed error messages
pub fn parse_octolens_toml(path: &Path) -> Result<OctolensConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_octolens_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse octolens.toml content from string
pub fn parse_octolens_toml_str(content: &str) -> Result<OctolensConfig> {
    let config: OctolensConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config)
}

/// Enhance TOML parsing errors with the offending line and its neighbours
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();
    let line_hint = error
        .span()
        .map(|span| content[..span.start.min(content.len())].matches('\n').count() + 1);

    match line_hint {
        Some(line_num) => {
            let context = get_line_context(content, line_num);
            anyhow::anyhow!(
                "TOML parsing error at line {}:\n{}\n\nError: {}",
                line_num,
                context,
                message
            )
        }
        None => anyhow::anyhow!("TOML parsing error: {}", message),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(3);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a configuration to TOML string
pub fn to_toml(config: &OctolensConfig) -> Result<String> {
    toml::to_string_pretty(config).with_context(|| "Failed to serialize configuration to TOML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
[server]
url = "https://acme.octopus.app"
api_key = "API-ABC"

[client]
page_size = 50
retry_delay_ms = 500
"#;

        let config = parse_octolens_toml_str(toml).unwrap();
        assert_eq!(config.server.url.as_deref(), Some("https://acme.octopus.app"));
        assert_eq!(config.client.page_size, 50);
        assert_eq!(config.client.retry_delay_ms, 500);
        assert_eq!(config.client.retry_attempts, 3);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_octolens_toml_str("").unwrap();
        assert_eq!(config, OctolensConfig::default());
    }

    #[test]
    fn test_parse_error_points_at_line() {
        let toml = "[server]\nurl = \"https://acme.octopus.app\"\n\n[client]\npage_size = \"many\"\n";

        let err = parse_octolens_toml_str(toml).unwrap_err().to_string();

        assert!(err.contains("line 5"), "{err}");
        assert!(err.contains(">>>    5 | page_size = \"many\""), "{err}");
    }

    #[test]
    fn test_invalid_url_fails_validation() {
        let toml = "[server]\nurl = \"not a url\"\n";
        assert!(parse_octolens_toml_str(toml).is_err());
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let mut original = OctolensConfig::new();
        original.server.url = Some("https://acme.octopus.app".into());
        original.client.max_concurrent_requests = 4;

        let parsed = parse_octolens_toml_str(&to_toml(&original).unwrap()).unwrap();

        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[client]\nuser_agent = \"octolens-test\"").unwrap();

        let config = parse_octolens_toml(temp_file.path()).unwrap();
        assert_eq!(config.client.user_agent, "octolens-test");
    }
}
