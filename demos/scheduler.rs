use htsc::{config::Config, Pipeline};

const PROGRAM: &str = "
let a : int = 10 ;
let b : float = 20.5 ;
let result : int = a + b ;
if ( result > 20 ) {
    quantum qubit1 perform_op ;
    blockchain transaction1 ;
}

memory allocate 1024 ;
sync quantum_operation ;
async blockchain_transaction ;
optimize ;
";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = Config::from_toml(
        r#"
        [executor]
        workers = 2
        delay_ms = 2000

        [pipeline]
        deploy = "Deploy Application"
        "#,
    )?;

    let compiled = Pipeline::new(config).compile("sample.hts", PROGRAM)?;

    println!("Compiled Executable Code:");
    for record in &compiled.records {
        println!("{}", record);
    }

    println!();
    for outcome in &compiled.report.outcomes {
        println!("{}", outcome);
    }

    Ok(())
}
