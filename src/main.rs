use anyhow::Context as _;
use ddcss::{Config, Css, StyleNode, StyleSheet};
use std::path::PathBuf;

fn usage<T>(err: &'static str) -> anyhow::Result<T> {
    let exe = std::env::args().next().unwrap_or_default();
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("Usage: {exe} [options] <globals.json> [styles.json ...]\n");
    println!("Compiles each styles file against the global styles and prints the");
    println!("resulting stylesheet.\n");
    println!("Options:");
    println!("    --root: Selector for global styles (default: :root)");
    println!("    --class: Class selector for every styles file (default: generated)\n");
    Err(anyhow::Error::msg(err))
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        return usage("Help requested");
    }
    let root = args.opt_value_from_str::<_, String>("--root")?;
    let class = args.opt_value_from_str::<_, String>("--class")?;
    let _ = args.contains("--");
    let Some(globals_path) = args.opt_free_from_str::<PathBuf>()? else {
        return usage("Missing global styles argument");
    };
    let styles = args
        .finish()
        .into_iter()
        .map(PathBuf::from)
        .collect::<Vec<_>>();
    if styles
        .iter()
        .any(|path| path.as_os_str().to_string_lossy().starts_with('-'))
    {
        return usage("Unknown option passed");
    }

    let globals = StyleNode::list_from_path(&globals_path)
        .with_context(|| format!("could not load '{}'", globals_path.display()))?;
    log::info!("Loaded {} global style objects", globals.len());

    let sheet = StyleSheet::new();
    let mut config = Config::new().sink(sheet.clone());
    if let Some(root) = root {
        config = config.root(root);
    }
    let css = Css::new(globals, config)?;

    for path in &styles {
        let node = StyleNode::from_path(path)
            .with_context(|| format!("could not load '{}'", path.display()))?;
        let name = css.css(&node, class.as_deref())?;
        log::info!("{} => {name}", path.display());
    }

    let flushes = css.run_pending()?;
    log::debug!("{flushes} flushes");

    for element in sheet.elements() {
        println!("{element}");
    }

    Ok(())
}
