use indices::{HandState, IndicesError, StrategyTables};

const UPCARD_COLUMNS: [(u8, &str); 10] = [
    (2, "2"),
    (3, "3"),
    (4, "4"),
    (5, "5"),
    (6, "6"),
    (7, "7"),
    (8, "8"),
    (9, "9"),
    (10, "X"),
    (1, "A"),
];
const CELL_WIDTH: usize = 6;

fn stiff_hands() -> impl Iterator<Item = HandState> {
    (12..=17).rev().map(HandState::hard)
}

fn header(title: &str) -> String {
    let mut out = format!("{}\n{:<4}", title, "+");
    for (_, label) in UPCARD_COLUMNS {
        out.push_str(&format!("{:>width$}", label, width = CELL_WIDTH));
    }
    out.push('\n');
    out
}

/// An index at the top of the range means the deviation never happens.
fn cell(tables: &StrategyTables, index: i32, buckets_per_count: f64) -> String {
    if index == tables.range().max {
        String::from("-")
    } else {
        format!("{:.1}", index as f64 / buckets_per_count)
    }
}

fn render_rows<F>(
    tables: &StrategyTables,
    title: &str,
    buckets_per_count: f64,
    index_of: F,
) -> Result<String, IndicesError>
where
    F: Fn(u8, HandState) -> Result<i32, IndicesError>,
{
    let mut out = header(title);
    for state in stiff_hands() {
        out.push_str(&format!("{:<4}", state.total));
        for (dealer_up_card, _) in UPCARD_COLUMNS {
            let index = index_of(dealer_up_card, state)?;
            out.push_str(&format!(
                "{:>width$}",
                cell(tables, index, buckets_per_count),
                width = CELL_WIDTH
            ));
        }
        out.push('\n');
    }
    Ok(out)
}

/// True counts at which hard 12 to 17 stop hitting, for hands of
/// `cards_held` cards.
pub fn render_stay_indices(
    tables: &StrategyTables,
    cards_held: u8,
    buckets_per_count: f64,
) -> Result<String, IndicesError> {
    render_rows(
        tables,
        &format!("Stay indices for {} cards:", cards_held),
        buckets_per_count,
        |dealer_up_card, state| tables.stay_index(cards_held, dealer_up_card, state),
    )
}

/// True counts at which two-card hard 12 to 17 should be surrendered.
pub fn render_surrender_indices(
    tables: &StrategyTables,
    buckets_per_count: f64,
) -> Result<String, IndicesError> {
    render_rows(
        tables,
        "Surrender indices for 2 cards:",
        buckets_per_count,
        |dealer_up_card, state| tables.surrender_index(dealer_up_card, state),
    )
}

/// Stay indices for every hand length followed by the surrender indices.
pub fn render_report(
    tables: &StrategyTables,
    buckets_per_count: f64,
) -> Result<String, IndicesError> {
    let mut out = String::new();
    for cards_held in indices::player::MIN_HAND_LENGTH..=tables.longest_played_hand() {
        out.push_str(&render_stay_indices(tables, cards_held, buckets_per_count)?);
        out.push('\n');
    }
    out.push_str(&render_surrender_indices(tables, buckets_per_count)?);
    Ok(out)
}
