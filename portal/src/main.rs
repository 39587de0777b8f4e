fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Non-interactive submission proof mode on in-memory services.
    // Usage: --submit-smoke or --submit-smoke=<document>
    // Writes `submit_smoke_transcript.log` under `Portal_Log/` and exits 0/1.
    if let Some(arg) = args
        .iter()
        .find(|a| a.as_str() == "--submit-smoke" || a.starts_with("--submit-smoke="))
    {
        docrequest_portal::run_submit_smoke(flag_value(arg));
        return;
    }

    // Non-interactive TUI smoke test mode (for automated checks).
    // Renders a single frame and exits 0.
    // Usage: --tui-smoke or --tui-smoke=picker|<document>[:<step>]
    if let Some(arg) = args
        .iter()
        .find(|a| a.as_str() == "--tui-smoke" || a.starts_with("--tui-smoke="))
    {
        docrequest_portal::run_tui_smoke(flag_value(arg));
        return;
    }

    if args.iter().any(|a| a == "--print-config") {
        docrequest_portal::print_config();
        return;
    }

    docrequest_portal::run_tui();
}

fn flag_value(arg: &str) -> Option<String> {
    arg.split_once('=')
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.trim().is_empty())
}
