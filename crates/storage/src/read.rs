//! Read-back of the serving relations (status endpoint and tests).

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::database::{to_u64, SqliteDatabase};
use crate::schema::SERVING_TABLES;
use etl_core::{
    AdAggregate, AgeDistribution, DashboardAggregate, EmotionDistribution, Error,
    GenderDistribution, Result,
};

/// What a dashboard reader currently sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServingSnapshot {
    /// `None` until the first load
    pub dashboard: Option<DashboardAggregate>,
    pub ads: Vec<AdAggregate>,
}

fn read_err(e: rusqlite::Error) -> Error {
    Error::internal(format!("Query error: {}", e))
}

/// Reads the served dataset in one read transaction.
pub async fn read_serving(db: &SqliteDatabase) -> Result<ServingSnapshot> {
    db.execute(|conn| {
        let tx = conn.transaction().map_err(read_err)?;
        let snapshot = ServingSnapshot {
            dashboard: read_dashboard(&tx)?,
            ads: read_ads(&tx)?,
        };
        tx.commit().map_err(read_err)?;
        Ok(snapshot)
    })
    .await
}

/// Row count of each serving relation, in [`SERVING_TABLES`] order.
pub async fn row_counts(db: &SqliteDatabase) -> Result<[i64; 5]> {
    db.execute(|conn| {
        let mut counts = [0i64; 5];
        for (slot, table) in counts.iter_mut().zip(SERVING_TABLES) {
            *slot = conn
                .query_row(&format!("SELECT count(*) FROM {}", table), [], |row| row.get(0))
                .map_err(read_err)?;
        }
        Ok(counts)
    })
    .await
}

fn read_dashboard(conn: &Connection) -> Result<Option<DashboardAggregate>> {
    let kpi: Option<(i64, i64, i64, f64)> = conn
        .query_row(
            "SELECT total_audience, total_views, total_ads, avg_view_seconds
             FROM metrics_kpi ORDER BY id DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()
        .map_err(read_err)?;

    let Some((audience, views, ads, avg)) = kpi else {
        return Ok(None);
    };

    let age: [i64; 5] = conn
        .query_row(
            "SELECT children, teenagers, young_adults, mid_aged, seniors
             FROM age_distribution ORDER BY id DESC LIMIT 1",
            [],
            |row| Ok([row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?]),
        )
        .optional()
        .map_err(read_err)?
        .unwrap_or_default();

    let gender: [i64; 2] = conn
        .query_row(
            "SELECT male, female FROM gender_distribution ORDER BY id DESC LIMIT 1",
            [],
            |row| Ok([row.get(0)?, row.get(1)?]),
        )
        .optional()
        .map_err(read_err)?
        .unwrap_or_default();

    let emotion: [i64; 4] = conn
        .query_row(
            "SELECT neutral, serious, happy, surprised
             FROM emotion_distribution ORDER BY id DESC LIMIT 1",
            [],
            |row| Ok([row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?]),
        )
        .optional()
        .map_err(read_err)?
        .unwrap_or_default();

    Ok(Some(DashboardAggregate {
        total_audience: to_u64(audience, "total_audience")?,
        total_views: to_u64(views, "total_views")?,
        total_ads: to_u64(ads, "total_ads")?,
        avg_view_seconds: avg,
        age: AgeDistribution {
            children: to_u64(age[0], "children")?,
            teenagers: to_u64(age[1], "teenagers")?,
            young_adults: to_u64(age[2], "young_adults")?,
            mid_aged: to_u64(age[3], "mid_aged")?,
            seniors: to_u64(age[4], "seniors")?,
        },
        gender: GenderDistribution {
            male: to_u64(gender[0], "male")?,
            female: to_u64(gender[1], "female")?,
        },
        emotion: EmotionDistribution {
            neutral: to_u64(emotion[0], "neutral")?,
            serious: to_u64(emotion[1], "serious")?,
            happy: to_u64(emotion[2], "happy")?,
            surprised: to_u64(emotion[3], "surprised")?,
        },
    }))
}

fn read_ads(conn: &Connection) -> Result<Vec<AdAggregate>> {
    let mut stmt = conn
        .prepare("SELECT ad_name, total_viewers, look_yes, look_no FROM advertisement ORDER BY id")
        .map_err(read_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })
        .map_err(read_err)?;

    let mut ads = Vec::new();
    for row in rows {
        let (ad_name, total, yes, no) = row.map_err(read_err)?;
        ads.push(AdAggregate {
            ad_name,
            total_viewers: to_u64(total, "total_viewers")?,
            look_yes: to_u64(yes, "look_yes")?,
            look_no: to_u64(no, "look_no")?,
        });
    }
    Ok(ads)
}
