//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered
//! by `RUST_LOG`. Module paths are hidden (`with_target(false)`); actor logs
//! carry an `entity_type` field instead.
//!
//! ```bash
//! RUST_LOG=info cargo run            # lifecycle and order transitions
//! RUST_LOG=debug cargo run           # every actor command and reply
//! RUST_LOG=loms::notifier=debug cargo run
//! ```
//!
//! A successful order at `info` reads roughly:
//!
//! ```text
//! INFO Actor started entity_type="StockBook" size=10
//! INFO Connected to broker attempt=1
//! INFO create_order{user_id=1}: Order created order_id=1
//! INFO pay_order{order_id=1}: Order payed order_id=1
//! ```

pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
