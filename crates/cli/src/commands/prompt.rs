//! `schemagent prompt`: Print the assembled system prompt.

use super::Runtime;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::load()?;
    println!("{}", runtime.assembler()?.generate());
    Ok(())
}
