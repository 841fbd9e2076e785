//! tabwire bridge binary
//!
//! Speaks length-prefixed JSON on stdin/stdout and answers every request
//! against the headless browser surface.

mod state;

pub use state::BridgeState;

use tabwire_core::Config;

pub fn run() -> anyhow::Result<()> {
    tabwire_core::init_logging();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let config = Config::load()?;
        let state = BridgeState::open(&config).await?;

        tracing::info!(
            database = %config.database_path.display(),
            commands = state.correlator().table().names().len(),
            "tabwire bridge started"
        );

        let codec = config.codec();
        let stats = state
            .correlator()
            .serve_io(tokio::io::stdin(), tokio::io::stdout(), codec)
            .await?;

        tracing::info!(
            received = stats.received,
            replied = stats.replied,
            failed = stats.failed,
            "tabwire bridge stopped"
        );
        Ok(())
    })
}
