use cartilla_backend::Directory;

use crate::cli::SourceArgs;
use crate::storage::open_sources;

pub fn run(args: &SourceArgs) -> anyhow::Result<()> {
    let (store, config) = open_sources(args)?;
    let directory = Directory::new(store, config);

    let counts = directory.source_counts();
    let width = counts.iter().map(|(t, _)| t.len()).max().unwrap_or(0);
    for (table, count) in counts {
        match count {
            Ok(n) => println!("{table:<width$}  {n}"),
            Err(e) => println!("{table:<width$}  error: {e}"),
        }
    }
    Ok(())
}
