//! domk demo - renders a todo list and prints the resulting markup

use anyhow::{Context as _, Result};
use domk::Host;
use domk_demo::{PAGE, add, item_node, mount, store};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let page = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?,
        None => PAGE.to_string(),
    };
    let host = Host::parse(&page).context("parsing page")?;
    let store = store();
    let _app = mount(&host, &store);

    for title in ["Write bindings", "Reconcile lists", "Ship it"] {
        add(&host, title);
    }
    let second = item_node(&host, 1).context("second item not rendered")?;
    if let Some(checkbox) = host.query_one(second, ".done") {
        host.dispatch_event(checkbox, "change");
    }
    tracing::info!("{} todo(s), {} remaining", store.get().items.len(), store.get().remaining());

    let body = host.body().context("page has no body")?;
    println!("{}", host.outer_html(body));
    Ok(())
}
