//! Read-only views over stored artifacts: `fandoms`, `fandom` and `pairings`.

use console::style;

use crate::analysis::{
    most_popular_pairings, order_fandoms, FandomOrder, FandomProfile, RelationshipKind,
    WordCountBins,
};
use crate::cli::icons::{bullet, dim_arrow, warn};
use crate::config::Settings;
use crate::models::TagType;
use crate::storage::{
    load_fandom_work_counts, load_non_fandom_tag_aggregates, load_work_fandoms, ArtifactPaths,
};
use crate::utils::format_count;

fn artifacts(settings: &Settings) -> anyhow::Result<ArtifactPaths> {
    let paths = ArtifactPaths::new(&settings.output_dir);
    if !paths.manifest.exists() {
        anyhow::bail!(
            "No artifacts in {}. Run 'ao3stats preprocess' first.",
            settings.output_dir.display()
        );
    }
    Ok(paths)
}

/// List retained fandoms.
pub fn cmd_fandoms(settings: &Settings, order: &str, limit: usize) -> anyhow::Result<()> {
    let order = FandomOrder::from_str(order)
        .ok_or_else(|| anyhow::anyhow!("Unknown order '{}' (popularity, alphabetical)", order))?;
    let paths = artifacts(settings)?;
    let counts = load_fandom_work_counts(&paths.fandom_works_count)?;

    if counts.is_empty() {
        println!("{} No fandoms above the minimum work count", warn());
        return Ok(());
    }

    let ordered = order_fandoms(&counts, order);
    let shown = if limit == 0 { ordered.len() } else { limit };
    println!(
        "{} ({} of {}, by {})",
        style("Fandoms").bold(),
        shown.min(ordered.len()),
        ordered.len(),
        order.as_str()
    );
    for count in ordered.iter().take(shown) {
        println!(
            "  {:>10}  {}",
            format_count(count.works_num),
            count.fandom_name
        );
    }
    Ok(())
}

/// Summary of one fandom: word counts, activity and top tags.
pub fn cmd_fandom(
    settings: &Settings,
    name: &str,
    top: usize,
    chord_top: usize,
) -> anyhow::Result<()> {
    let paths = artifacts(settings)?;
    let work_fandoms = load_work_fandoms(&paths.works_with_fandom)?;
    let aggregates = load_non_fandom_tag_aggregates(&paths.non_fandom_tags_agg)?;

    let profile = FandomProfile::new(name, &work_fandoms, &aggregates);
    if profile.is_empty() {
        anyhow::bail!("Fandom '{}' not found. See 'ao3stats fandoms'.", name);
    }

    println!(
        "{} ({} works)",
        style(&profile.name).bold(),
        format_count(profile.works().len() as u64)
    );

    if let Some(stats) = profile.word_count_stats() {
        println!(
            "  {} Word count: mean {}, median {} over {} works",
            dim_arrow(),
            format_count(stats.mean),
            format_count(stats.median),
            format_count(stats.works)
        );
    }

    print_section("Word count distribution");
    for bin in profile.word_count_distribution(&WordCountBins::default()) {
        if bin.works > 0 {
            println!("  {:<14} {:>8}", bin.label, format_count(bin.works));
        }
    }

    print_section("Works by month");
    for month in profile.works_by_month() {
        println!(
            "  {}-{:02}  {:>8}",
            month.year,
            month.month,
            format_count(month.works)
        );
    }

    for tag_type in [
        TagType::Relationship,
        TagType::Freeform,
        TagType::Rating,
        TagType::ArchiveWarning,
    ] {
        let tags = profile.top_tags(&tag_type, top);
        if tags.is_empty() {
            continue;
        }
        print_section(&format!("Top {} tags", tag_type));
        for tag in tags {
            let mean = tag
                .word_count_mean
                .map(|m| format!("{:.0} words avg", m))
                .unwrap_or_default();
            println!(
                "  {} {:>8}  {}  {}",
                bullet(),
                format_count(tag.works_num),
                tag.tag_name,
                style(mean).dim()
            );
        }
    }

    for kind in [RelationshipKind::Romantic, RelationshipKind::Platonic] {
        let matrix = profile.chord_matrix(kind, chord_top);
        if matrix.is_empty() {
            continue;
        }
        print_section(&format!("Top {} pairs", kind.as_str()));
        let mut pairs = Vec::new();
        for (i, a) in matrix.characters.iter().enumerate() {
            for (j, b) in matrix.characters.iter().enumerate().skip(i + 1) {
                let works = matrix.values[i][j];
                if works > 0 {
                    pairs.push((works, a, b));
                }
            }
        }
        pairs.sort_by(|x, y| y.0.cmp(&x.0).then_with(|| (x.1, x.2).cmp(&(y.1, y.2))));
        for (works, a, b) in pairs.into_iter().take(top) {
            println!(
                "  {} {:>8}  {} {} {}",
                bullet(),
                format_count(works),
                a,
                kind.separator(),
                b
            );
        }
    }

    Ok(())
}

/// Most popular relationship per fandom, largest fandoms first.
pub fn cmd_pairings(settings: &Settings, limit: usize) -> anyhow::Result<()> {
    let paths = artifacts(settings)?;
    let counts = load_fandom_work_counts(&paths.fandom_works_count)?;
    let aggregates = load_non_fandom_tag_aggregates(&paths.non_fandom_tags_agg)?;

    let pairings = most_popular_pairings(&aggregates, &counts, limit);
    if pairings.is_empty() {
        println!("{} No relationship tags in the retained fandoms", warn());
        return Ok(());
    }

    for pairing in pairings {
        println!(
            "{} {}",
            style(&*pairing.fandom_name).bold(),
            style(format!("({} works)", format_count(pairing.fandom_works))).dim()
        );
        println!(
            "  {} {} ({} works, {:.1}%)",
            dim_arrow(),
            pairing.relationship,
            format_count(pairing.works_num),
            pairing.pct_of_fandom * 100.0
        );
    }
    Ok(())
}

fn print_section(title: &str) {
    println!();
    println!("{}", style(title).underlined());
}
