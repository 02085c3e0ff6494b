//! Domains command - lists the domain filter table

use crate::domain::matching::DomainFilter;

pub async fn run() -> anyhow::Result<()> {
    for domain in DomainFilter::available_domains() {
        println!("{}", domain);
    }

    Ok(())
}
