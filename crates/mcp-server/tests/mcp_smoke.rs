use anyhow::{Context, Result};
use rmcp::{model::CallToolRequestParam, service::ServiceExt, transport::TokioChildProcess};
use serde_json::json;
use std::time::Duration;
use tokio::process::Command;

mod support;

const EXPECTED_TOOLS: [&str; 14] = [
    "godot_status",
    "godot_get_errors",
    "godot_run_scene",
    "godot_stop_scene",
    "godot_reload_filesystem",
    "godot_log",
    "godot_get_phase",
    "godot_update_phase",
    "godot_evaluate_quality",
    "godot_score_poc",
    "godot_list_quality_reports",
    "godot_parse_scene",
    "godot_save_build_state",
    "godot_load_build_state",
];

#[tokio::test]
async fn stdio_server_lists_tools_and_reports_missing_editor() -> Result<()> {
    let bin = support::locate_gdbridge_mcp_bin()?;
    let project = tempfile::tempdir().context("tempdir")?;
    std::fs::write(
        project.path().join("main.tscn"),
        "[gd_scene format=3]\n\n[node name=\"Main\" type=\"Node2D\"]\n",
    )
    .context("write main.tscn")?;

    // Nothing listens here once the placeholder listener is dropped.
    let placeholder = std::net::TcpListener::bind("127.0.0.1:0").context("bind placeholder")?;
    let port = placeholder.local_addr().context("placeholder addr")?.port();
    drop(placeholder);

    let mut cmd = Command::new(bin);
    cmd.env("GODOT_PROJECT_ROOT", project.path());
    cmd.env("GODOT_BRIDGE_URL", format!("http://127.0.0.1:{port}"));
    cmd.env("RUST_LOG", "warn");

    let transport = TokioChildProcess::new(cmd).context("spawn mcp server")?;
    let service = tokio::time::timeout(Duration::from_secs(10), ().serve(transport))
        .await
        .context("timeout starting MCP server")?
        .context("start MCP server")?;

    let tools = tokio::time::timeout(
        Duration::from_secs(10),
        service.list_tools(Default::default()),
    )
    .await
    .context("timeout listing tools")?
    .context("list tools")?;
    let mut names: Vec<String> = tools.tools.iter().map(|t| t.name.to_string()).collect();
    names.sort();
    let mut expected: Vec<String> = EXPECTED_TOOLS.iter().map(|s| s.to_string()).collect();
    expected.sort();
    assert_eq!(names, expected);

    let status = tokio::time::timeout(
        Duration::from_secs(10),
        service.call_tool(CallToolRequestParam {
            name: "godot_status".into(),
            arguments: json!({}).as_object().cloned(),
        }),
    )
    .await
    .context("timeout calling godot_status")?
    .context("call godot_status")?;
    assert_eq!(status.is_error, Some(true));
    let structured = status
        .structured_content
        .context("godot_status structured_content")?;
    assert_eq!(structured["error"]["code"], json!("editor_unreachable"));

    let scene = tokio::time::timeout(
        Duration::from_secs(10),
        service.call_tool(CallToolRequestParam {
            name: "godot_parse_scene".into(),
            arguments: json!({ "path": "res://main.tscn" }).as_object().cloned(),
        }),
    )
    .await
    .context("timeout calling godot_parse_scene")?
    .context("call godot_parse_scene")?;
    assert_ne!(scene.is_error, Some(true));
    let structured = scene
        .structured_content
        .context("godot_parse_scene structured_content")?;
    assert_eq!(structured["node_tree"], json!(["Main"]));

    service.cancel().await.context("shutdown mcp service")?;
    Ok(())
}
