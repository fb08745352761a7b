use rask_log_encoder::app;

fn main() -> anyhow::Result<()> {
    app::main()
}
