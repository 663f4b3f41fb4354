//! One-shot metadata dumps written to stdout.

use std::io::Write;

use pluginserver_core::{AppError, AppResult};
use pluginserver_plugin::{InfoExtractor, PluginInfo};

/// Outcome of a full directory dump.
#[derive(Debug, Default)]
pub struct DumpSummary {
    /// Records written.
    pub dumped: usize,
    /// Plugins that were skipped, with the reason.
    pub failed: Vec<(String, AppError)>,
}

/// Writes one plugin's record as a MessagePack map.
pub async fn dump_plugin_info<W: Write>(
    extractor: &InfoExtractor,
    name: &str,
    mut out: W,
) -> AppResult<()> {
    let info = extractor.get_info(name).await?;
    rmp_serde::encode::write_named(&mut out, &info)
        .map_err(|e| AppError::encoding(format!("Failed to encode plugin info: {}", e)))?;
    out.flush()?;
    Ok(())
}

/// Writes the records of every discovered plugin as a JSON array.
///
/// Plugins that fail to load or describe themselves are logged and left out.
pub async fn dump_all_plugins<W: Write>(
    extractor: &InfoExtractor,
    mut out: W,
) -> AppResult<DumpSummary> {
    let mut summary = DumpSummary::default();
    let mut infos: Vec<PluginInfo> = Vec::new();

    for name in extractor.registry().discover()? {
        match extractor.get_info(&name).await {
            Ok(info) => infos.push(info),
            Err(e) => {
                tracing::warn!(plugin = %name, error = %e, "Skipping plugin");
                summary.failed.push((name, e));
            }
        }
    }

    serde_json::to_writer(&mut out, &infos)?;
    writeln!(out)?;
    out.flush()?;

    summary.dumped = infos.len();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use pluginserver_core::ErrorKind;
    use pluginserver_plugin::{BuiltinLoader, Phase, PluginRegistry, StaticModule};

    use super::*;

    fn extractor(dir: &Path, loader: BuiltinLoader, files: &[&str]) -> InfoExtractor {
        for name in files {
            std::fs::write(dir.join(format!("{name}.so")), b"").expect("touch");
        }
        InfoExtractor::new(Arc::new(PluginRegistry::new(dir, Arc::new(loader))))
    }

    fn loader() -> BuiltinLoader {
        BuiltinLoader::new()
            .with_module(
                "rate-limit",
                Arc::new(
                    StaticModule::new(r#"{"fields": []}"#)
                        .with_phases(&[Phase::Access, Phase::Log])
                        .with_priority(901),
                ),
            )
            .with_module(
                "auth",
                Arc::new(StaticModule::new("{}").with_phases(&[Phase::Access])),
            )
            .with_module("broken", Arc::new(StaticModule::new("[unterminated")))
    }

    #[tokio::test]
    async fn test_dump_all_lists_every_plugin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extractor = extractor(dir.path(), loader(), &["rate-limit", "auth"]);

        let mut out = Vec::new();
        let summary = dump_all_plugins(&extractor, &mut out).await.expect("dump");
        assert_eq!(summary.dumped, 2);
        assert!(summary.failed.is_empty());

        let records: Vec<serde_json::Value> = serde_json::from_slice(&out).expect("json");
        assert_eq!(records.len(), 2);

        let mut names: Vec<&str> = records
            .iter()
            .map(|r| r["Name"].as_str().expect("Name"))
            .collect();
        names.sort_unstable();
        assert_eq!(names, vec!["auth", "rate-limit"]);

        for record in &records {
            assert!(record["Phases"].is_array());
        }
    }

    #[tokio::test]
    async fn test_dump_all_skips_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extractor = extractor(dir.path(), loader(), &["auth", "broken"]);

        let mut out = Vec::new();
        let summary = dump_all_plugins(&extractor, &mut out).await.expect("dump");
        assert_eq!(summary.dumped, 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "broken");
        assert_eq!(summary.failed[0].1.kind, ErrorKind::PluginIntrospection);

        let records: Vec<serde_json::Value> = serde_json::from_slice(&out).expect("json");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Name"], "auth");
    }

    #[tokio::test]
    async fn test_dump_all_on_empty_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extractor = extractor(dir.path(), loader(), &[]);

        let mut out = Vec::new();
        dump_all_plugins(&extractor, &mut out).await.expect("dump");
        assert_eq!(String::from_utf8(out).expect("utf8"), "[]\n");
    }

    #[tokio::test]
    async fn test_dump_one_writes_msgpack_map() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extractor = extractor(dir.path(), loader(), &["rate-limit"]);

        let mut out = Vec::new();
        dump_plugin_info(&extractor, "rate-limit", &mut out)
            .await
            .expect("dump");

        let value = rmpv::decode::read_value(&mut &out[..]).expect("msgpack");
        let entries = value.as_map().expect("map");
        let get = |key: &str| {
            entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("Name"), Some(rmpv::Value::from("rate-limit")));
        assert_eq!(get("Priority").and_then(|v| v.as_i64()), Some(901));
        assert!(get("Schema").is_some_and(|schema| schema.is_map()));
    }

    #[tokio::test]
    async fn test_dump_one_missing_plugin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extractor = extractor(dir.path(), loader(), &[]);

        let mut out = Vec::new();
        let err = dump_plugin_info(&extractor, "rate-limit", &mut out)
            .await
            .expect_err("missing");
        assert_eq!(err.kind, ErrorKind::PluginNotFound);
        assert!(out.is_empty());
    }
}
