use crate::model::*;

// ── Free-slot algorithm ───────────────────────────────────────────

/// Free gaps of one (category, date) within business hours.
///
/// `bookings` must be sorted and non-overlapping. The result together with
/// `bookings` tiles `[08:00, 22:00)` exactly.
pub fn free_slots(bookings: &[Span]) -> Vec<Span> {
    let hours = Span::business_hours();
    let mut free = Vec::with_capacity(bookings.len() + 1);
    let mut cursor = hours.start;

    for booked in bookings {
        if booked.end <= cursor {
            continue;
        }
        if booked.start >= hours.end {
            break;
        }
        if booked.start > cursor {
            free.push(Span::new(cursor, booked.start));
        }
        cursor = booked.end;
    }

    if cursor < hours.end {
        free.push(Span::new(cursor, hours.end));
    }
    free
}

/// Like [`free_slots`], dropping gaps shorter than `min_duration` minutes.
pub fn free_slots_at_least(bookings: &[Span], min_duration: Option<Minute>) -> Vec<Span> {
    let mut free = free_slots(bookings);
    if let Some(min) = min_duration {
        free.retain(|s| s.duration() >= min);
    }
    free
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: Minute = 60;
    const M: Minute = 1;

    /// Merge sorted touching spans.
    fn merge_adjacent(sorted: &[Span]) -> Vec<Span> {
        let mut merged: Vec<Span> = Vec::new();
        for &span in sorted {
            match merged.last_mut() {
                Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
                _ => merged.push(span),
            }
        }
        merged
    }

    // ── free_slots ────────────────────────────────────────

    #[test]
    fn empty_day_is_all_business_hours() {
        assert_eq!(free_slots(&[]), vec![Span::new(8 * H, 22 * H)]);
    }

    #[test]
    fn gaps_around_two_bookings() {
        let bookings = vec![Span::new(9 * H, 12 * H), Span::new(14 * H, 17 * H)];
        assert_eq!(
            free_slots(&bookings),
            vec![
                Span::new(8 * H, 9 * H),
                Span::new(12 * H, 14 * H),
                Span::new(17 * H, 22 * H),
            ]
        );
    }

    #[test]
    fn no_zero_length_gaps() {
        let bookings = vec![
            Span::new(8 * H, 10 * H),
            Span::new(10 * H, 12 * H),
            Span::new(20 * H, 22 * H),
        ];
        assert_eq!(free_slots(&bookings), vec![Span::new(12 * H, 20 * H)]);
    }

    #[test]
    fn fully_booked_day_has_no_slots() {
        assert!(free_slots(&[Span::new(8 * H, 22 * H)]).is_empty());
    }

    #[test]
    fn minute_granularity_gaps() {
        let bookings = vec![Span::new(9 * H + 15 * M, 9 * H + 45 * M)];
        assert_eq!(
            free_slots(&bookings),
            vec![
                Span::new(8 * H, 9 * H + 15 * M),
                Span::new(9 * H + 45 * M, 22 * H),
            ]
        );
    }

    #[test]
    fn min_duration_filters_short_gaps() {
        let bookings = vec![Span::new(9 * H, 12 * H), Span::new(12 * H + 30 * M, 21 * H)];
        assert_eq!(
            free_slots_at_least(&bookings, Some(60)),
            vec![Span::new(8 * H, 9 * H), Span::new(21 * H, 22 * H)]
        );
        assert_eq!(free_slots_at_least(&bookings, None).len(), 3);
    }

    #[test]
    fn slots_and_bookings_tile_business_hours() {
        let bookings = vec![
            Span::new(8 * H + 30 * M, 9 * H),
            Span::new(11 * H, 13 * H),
            Span::new(13 * H, 14 * H),
            Span::new(21 * H, 22 * H),
        ];
        let mut all = free_slots(&bookings);
        all.extend_from_slice(&bookings);
        all.sort();
        assert_eq!(all.first().unwrap().start, 8 * H);
        assert_eq!(all.last().unwrap().end, 22 * H);
        for pair in all.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(merge_adjacent(&all), vec![Span::business_hours()]);
    }

    #[test]
    fn bookings_at_the_edges() {
        let bookings = vec![Span::new(8 * H, 8 * H + 1), Span::new(22 * H - 1, 22 * H)];
        assert_eq!(free_slots(&bookings), vec![Span::new(8 * H + 1, 22 * H - 1)]);
    }

    #[test]
    fn single_booking_in_the_middle() {
        assert_eq!(
            free_slots(&[Span::new(10 * H, 11 * H)]),
            vec![Span::new(8 * H, 10 * H), Span::new(11 * H, 22 * H)]
        );
    }
}
