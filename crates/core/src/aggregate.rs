//! Batch aggregation into dashboard and per-advertisement statistics.
//!
//! Pure and order-insensitive apart from the first-seen tie-break on ads.

use std::collections::{HashMap, HashSet};

use crate::analytics::{
    AdAggregate, AgeDistribution, DashboardAggregate, EmotionDistribution, GenderDistribution,
    DEFAULT_TOTAL_ADS, LOOK_THRESHOLD,
};
use crate::events::RawEvent;

/// Aggregates a batch into the dashboard totals and the ad list.
pub fn aggregate(events: &[RawEvent]) -> (DashboardAggregate, Vec<AdAggregate>) {
    (dashboard(events), ads(events))
}

/// Computes the overall dashboard aggregate.
pub fn dashboard(events: &[RawEvent]) -> DashboardAggregate {
    let viewers: HashSet<&str> = events.iter().map(|e| e.viewer_id.as_str()).collect();
    let distinct_ads: HashSet<&str> = events.iter().filter_map(|e| e.ad_name.as_deref()).collect();

    let durations: Vec<f64> = events.iter().filter_map(|e| e.session_duration).collect();
    let avg_view_seconds = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<f64>() / durations.len() as f64
    };

    let mut age = AgeDistribution::default();
    let mut gender = GenderDistribution::default();
    let mut emotion = EmotionDistribution::default();

    for event in events {
        if let Some(band) = event.age.and_then(age_band) {
            match band {
                AgeBand::Children => age.children += 1,
                AgeBand::Teenagers => age.teenagers += 1,
                AgeBand::YoungAdults => age.young_adults += 1,
                AgeBand::MidAged => age.mid_aged += 1,
                AgeBand::Seniors => age.seniors += 1,
            }
        }
        match event.gender.as_deref() {
            Some("Male") => gender.male += 1,
            Some("Female") => gender.female += 1,
            _ => {}
        }
        match event.emotion.as_deref() {
            Some("neutral") => emotion.neutral += 1,
            Some("serious") => emotion.serious += 1,
            Some("happy") => emotion.happy += 1,
            Some("surprised") => emotion.surprised += 1,
            _ => {}
        }
    }

    let total_ads = match distinct_ads.len() as u64 {
        0 => DEFAULT_TOTAL_ADS,
        n => n,
    };

    DashboardAggregate {
        total_audience: viewers.len() as u64,
        total_views: events.len() as u64,
        total_ads,
        avg_view_seconds,
        age,
        gender,
        emotion,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBand {
    Children,
    Teenagers,
    YoungAdults,
    MidAged,
    Seniors,
}

/// Band for an age. Age 0 is treated as unknown.
pub fn age_band(age: u32) -> Option<AgeBand> {
    match age {
        0 => None,
        1..=12 => Some(AgeBand::Children),
        13..=19 => Some(AgeBand::Teenagers),
        20..=35 => Some(AgeBand::YoungAdults),
        36..=55 => Some(AgeBand::MidAged),
        _ => Some(AgeBand::Seniors),
    }
}

/// Computes one aggregate per advertisement, most viewed first.
///
/// Ties keep the order in which the ads first appear in the batch.
pub fn ads(events: &[RawEvent]) -> Vec<AdAggregate> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<AdAggregate> = Vec::new();

    for event in events {
        let Some(name) = event.ad_name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        let slot = *index.entry(name).or_insert_with(|| {
            out.push(AdAggregate {
                ad_name: name.to_string(),
                total_viewers: 0,
                look_yes: 0,
                look_no: 0,
            });
            out.len() - 1
        });

        let ad = &mut out[slot];
        ad.total_viewers += 1;
        if event.engagement_rate.is_some_and(|r| r >= LOOK_THRESHOLD) {
            ad.look_yes += 1;
        } else {
            ad.look_no += 1;
        }
    }

    out.sort_by(|a, b| b.total_viewers.cmp(&a.total_viewers));
    out
}
