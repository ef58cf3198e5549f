use crate::constants::CHAOS_ORB;
use crate::database::{ Database, DatabaseResult };
use crate::logger::{ self, LogTag };

/// Best current understanding of the chaos value of `price` units of the
/// named currency in a league, or None when the exchange graph has no
/// usable path.
///
/// The highest-weighted conversion wins, on the theory that weight (total
/// time-decayed sample weight) is the most stable-sample proxy we have.
/// The exchange is only followed two levels down: `X -> chaos` and
/// `X -> Y -> chaos`, a two-hop path scoring `min(weight(X->Y),
/// weight(Y->chaos))`. If everything fails, an inverse `chaos -> X` edge
/// is used; that is a demand-side order so it is less reliable, but if
/// it's all we have, we roll with it.
pub fn find_value_of(
    db: &Database,
    name: &str,
    league: &str,
    price: f64
) -> DatabaseResult<Option<f64>> {
    // The value of a chaos orb is always 1 chaos orb
    if name == CHAOS_ORB {
        return Ok(Some(price));
    }

    let mut high_score: Option<f64> = None;
    let mut conversion: Option<f64> = None;

    for row in db.summaries_from(name, league)? {
        if row.to_currency == CHAOS_ORB {
            // Rows arrive ordered by weight descending, so no better
            // direct edge can follow this one
            if high_score.map_or(true, |hs| row.weight >= hs) {
                logger::debug(
                    LogTag::Currency,
                    &format!("Conversion discovered {} -> Chaos = {}", name, row.mean)
                );
                high_score = Some(row.weight);
                conversion = Some(row.mean);
            }
            break;
        }

        if let Some(hs) = high_score {
            if row.weight <= hs {
                // Can't get better than the high score
                continue;
            }
        }

        if let Some(second) = db.get_summary(&row.to_currency, CHAOS_ORB, league)? {
            let score = row.weight.min(second.weight);
            if high_score.map_or(true, |hs| score > hs) {
                high_score = Some(score);
                conversion = Some(row.mean * second.mean);
                logger::debug(
                    LogTag::Currency,
                    &format!(
                        "Conversion discovered {} -> {} ({}) -> Chaos ({}) = {}",
                        name,
                        row.to_currency,
                        row.mean,
                        second.mean,
                        row.mean * second.mean
                    )
                );
            }
        }
    }

    if high_score.is_some() {
        return Ok(conversion.map(|c| c * price));
    }

    // Fall back on inverse chaos -> name pricing
    if let Some(inverse_row) = db.get_summary(CHAOS_ORB, name, league)? {
        let inverse = 1.0 / inverse_row.mean;
        logger::debug(
            LogTag::Currency,
            &format!("Falling back on inverse Chaos -> {} pricing: {}", name, inverse)
        );
        return Ok(Some(inverse * price));
    }

    Ok(None)
}
