//! build-data: compile a text phrase table into the engine's data files.
//!
//! The input is one phrase per line: the phrase, its frequency, then one
//! bopomofo syllable per character, whitespace separated:
//!
//! ```text
//! 你好 800 ㄋㄧˇ ㄏㄠˇ
//! 測試 500 ㄘㄜˋ ㄕˋ
//! ```
//!
//! Lines starting with `#` and blank lines are skipped. Output is the
//! phrase arena (`dict.dat`) and the phrase tree (`fonetree.dat`).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use zhuyin_core::syllable::Syllable;
use zhuyin_core::TrieBuilder;

#[derive(Parser, Debug)]
#[command(name = "build-data", about = "Compile a phrase table into dict.dat + fonetree.dat")]
struct Args {
    /// Phrase table, one `phrase freq syllables...` entry per line
    #[arg(short, long)]
    input: PathBuf,

    /// Directory receiving dict.dat and fonetree.dat
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let file = File::open(&args.input)
        .with_context(|| format!("open phrase table {}", args.input.display()))?;
    let reader = BufReader::new(file);

    let mut builder = TrieBuilder::new();
    let mut entries = 0usize;
    let mut skipped = 0usize;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_ascii_whitespace();
        let (Some(phrase), Some(freq)) = (fields.next(), fields.next()) else {
            bail!("line {}: expected `phrase freq syllables...`", lineno + 1);
        };
        let freq: u32 = freq
            .parse()
            .with_context(|| format!("line {}: bad frequency {freq:?}", lineno + 1))?;
        let syllables: Vec<Syllable> = match fields.map(str::parse).collect() {
            Ok(syllables) => syllables,
            Err(err) => {
                log::warn!("line {}: {err}; skipping {phrase:?}", lineno + 1);
                skipped += 1;
                continue;
            }
        };
        match builder.insert(&syllables, phrase, freq) {
            Ok(()) => entries += 1,
            Err(err) => {
                log::warn!("line {}: {err}; skipping", lineno + 1);
                skipped += 1;
            }
        }
    }

    let arena_path = args.output_dir.join("dict.dat");
    let tree_path = args.output_dir.join("fonetree.dat");
    builder
        .write_to(&arena_path, &tree_path)
        .context("write data files")?;
    log::info!(
        "wrote {} phrases to {} (skipped {})",
        entries,
        args.output_dir.display(),
        skipped
    );
    println!("{entries} phrases compiled, {skipped} skipped");
    Ok(())
}
