// Logs go to stderr; stdout carries the channel
fn main() -> anyhow::Result<()> {
    tabwire_lib::run()
}
