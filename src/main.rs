use myuchip_vm::{Args, Core, Parser};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut core = Core::new(Args::parse())?;
    core.run()?;

    Ok(())
}
