use anyhow::{Context, Result, bail};

/// Most seeds a single invocation may expand to.
pub const MAX_SEEDS: u64 = 10_000;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse seed tokens. Each token is a number or an inclusive `lo..hi` range.
pub fn parse_seeds(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    for token in tokens {
        if let Some((lo, hi)) = token.split_once("..") {
            let lo: u64 = lo.parse().with_context(|| format!("bad seed range {token}"))?;
            let hi: u64 = hi.parse().with_context(|| format!("bad seed range {token}"))?;
            if lo > hi {
                bail!("seed range {token} is empty");
            }
            let room = MAX_SEEDS - seeds.len() as u64;
            if hi - lo >= room {
                bail!("seed range {token} exceeds the limit of {MAX_SEEDS} seeds");
            }
            seeds.extend(lo..=hi);
        } else {
            if seeds.len() as u64 >= MAX_SEEDS {
                bail!("more than {MAX_SEEDS} seeds given");
            }
            seeds.push(
                token
                    .parse()
                    .with_context(|| format!("seed {token} is not a number"))?,
            );
        }
    }
    if seeds.is_empty() {
        bail!("no seeds given");
    }
    Ok(seeds)
}
