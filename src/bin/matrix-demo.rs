use anyhow::Result;
use locked_ledger::matrix::{Matrix, multiply_concurrent};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let a = Matrix::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]])?;
    let b = Matrix::from_rows(vec![vec![9, 8, 7], vec![6, 5, 4], vec![3, 2, 1]])?;

    println!("Matrix A:\n{a}");
    println!("Matrix B:\n{b}");
    let c = multiply_concurrent(&a, &b)?;
    println!("Matrix C (A x B):\n{c}");
    Ok(())
}
