//! Gang Client - composition root binary.
//!
//! In the browser this mounts the sync layer on the rendered page. Natively it
//! runs headless: same socket, identity store and hooks, with file storage and
//! a virtual player form.

#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gang_client::connection::DebugConsole;

fn main() -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = dotenvy::from_filename(".env.local");
        dotenvy::dotenv().ok();

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "gang_client=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    tracing::info!("Starting Gang Client");

    #[cfg(not(target_arch = "wasm32"))]
    return headless::run();

    #[cfg(target_arch = "wasm32")]
    return browser::run();
}

/// Apply `debug` and `latency` flags from the environment or query string.
fn apply_debug_flags(console: &DebugConsole, debug: Option<&str>, latency_ms: Option<&str>) {
    if matches!(debug, Some("1" | "true" | "on")) {
        console.enable_debug();
    }
    match latency_ms.map(|raw| raw.trim().parse::<u64>()) {
        Some(Ok(ms)) if ms > 0 => console.enable_latency_sim(ms),
        Some(Err(e)) => tracing::warn!("Ignoring latency simulation value: {}", e),
        _ => {}
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::rc::Rc;

    use anyhow::Context;
    use gang_protocol::BroadcastEvent;

    use gang_client::hooks::hook_names;
    use gang_client::infrastructure::platform::{create_platform, HeadlessElement};
    use gang_client::infrastructure::transport::DesktopConnector;
    use gang_client::{AppContext, ClientConfig};

    const PLAYER_FORM_ID: &str = "player-form";

    pub fn run() -> anyhow::Result<()> {
        let config = ClientConfig::from_env()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building tokio runtime")?;
        let local = tokio::task::LocalSet::new();

        local.block_on(&runtime, async move {
            let platform = create_platform(&config);
            let mut app = AppContext::start(platform, Rc::new(DesktopConnector::new()), config)?;

            super::apply_debug_flags(
                app.debug_console(),
                std::env::var("GANG_DEBUG").ok().as_deref(),
                std::env::var("GANG_LATENCY_SIM_MS").ok().as_deref(),
            );

            // Mount the virtual form once the first join completes
            let hooks = app.hooks().clone();
            app.broadcast().subscribe(move |event| {
                if event == BroadcastEvent::PageLoadingStop && !hooks.is_attached(PLAYER_FORM_ID) {
                    hooks.attach(
                        PLAYER_FORM_ID,
                        hook_names::SET_PLAYER_NAME,
                        Rc::new(HeadlessElement),
                    );
                }
            });

            tokio::signal::ctrl_c()
                .await
                .context("installing Ctrl+C handler")?;
            tracing::info!("Received Ctrl+C, shutting down");

            app.teardown();
            app.broadcast().clear();
            while app.socket().is_running() {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
            Ok::<(), anyhow::Error>(())
        })
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use std::rc::Rc;

    use anyhow::anyhow;

    use gang_client::infrastructure::dom::DomBridge;
    use gang_client::infrastructure::platform::create_platform;
    use gang_client::infrastructure::transport::WasmConnector;
    use gang_client::{AppContext, ClientConfig};

    pub fn run() -> anyhow::Result<()> {
        let window = web_sys::window().ok_or_else(|| anyhow!("no window"))?;
        let location = window.location();
        let config = ClientConfig::for_location(
            &location.protocol().unwrap_or_default(),
            &location.host().unwrap_or_default(),
        );

        let platform = create_platform(&config);
        let app = AppContext::start(platform, Rc::new(WasmConnector::new()), config)?;

        let search = location.search().unwrap_or_default();
        let query: Vec<(String, String)> =
            url::form_urlencoded::parse(search.trim_start_matches('?').as_bytes())
                .into_owned()
                .collect();
        super::apply_debug_flags(
            app.debug_console(),
            query_value(&query, "debug"),
            query_value(&query, "latency"),
        );

        let bridge = DomBridge::install(app.hooks().clone(), app.broadcast().clone());

        // Both live as long as the page
        std::mem::forget(bridge);
        std::mem::forget(app);
        Ok(())
    }

    fn query_value<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
        query
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v.as_str())
    }
}
