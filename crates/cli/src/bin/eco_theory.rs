use anyhow::Result;

fn main() -> Result<()> {
    eco_cli::main_entry()
}
