use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    docent::cli::main()
}
