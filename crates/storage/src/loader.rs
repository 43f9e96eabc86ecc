//! All-or-nothing replacement of the serving relations.

use async_trait::async_trait;
use rusqlite::{params, Connection, TransactionBehavior};
use tracing::debug;

use crate::database::{to_i64, SqliteDatabase};
use crate::schema::SERVING_TABLES;
use etl_core::{AdAggregate, AnalyticsLoader, DashboardAggregate, Error, Result};

/// [`AnalyticsLoader`] writing the five serving relations in one transaction.
#[derive(Clone)]
pub struct SqliteAnalyticsLoader {
    db: SqliteDatabase,
}

impl SqliteAnalyticsLoader {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AnalyticsLoader for SqliteAnalyticsLoader {
    async fn replace(&self, dashboard: &DashboardAggregate, ads: &[AdAggregate]) -> Result<()> {
        let dashboard = dashboard.clone();
        let ads = ads.to_vec();
        let ad_count = ads.len();

        self.db
            .execute(move |conn| {
                replace_all(conn, &dashboard, &ads)
                    .map_err(|e| Error::load(format!("replace failed: {}", e)))
            })
            .await?;

        debug!(ads = ad_count, "Replaced serving dataset");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.db.ping().await
    }
}

fn replace_all(
    conn: &mut Connection,
    dashboard: &DashboardAggregate,
    ads: &[AdAggregate],
) -> rusqlite::Result<()> {
    // Write lock is held from the first delete until commit.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    for table in SERVING_TABLES {
        tx.execute(&format!("DELETE FROM {}", table), [])?;
    }

    tx.execute(
        "INSERT INTO metrics_kpi (total_audience, total_views, total_ads, avg_view_seconds)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            to_i64(dashboard.total_audience)?,
            to_i64(dashboard.total_views)?,
            to_i64(dashboard.total_ads)?,
            dashboard.avg_view_seconds,
        ],
    )?;

    let age = &dashboard.age;
    tx.execute(
        "INSERT INTO age_distribution (children, teenagers, young_adults, mid_aged, seniors)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            to_i64(age.children)?,
            to_i64(age.teenagers)?,
            to_i64(age.young_adults)?,
            to_i64(age.mid_aged)?,
            to_i64(age.seniors)?,
        ],
    )?;

    tx.execute(
        "INSERT INTO gender_distribution (male, female) VALUES (?1, ?2)",
        params![
            to_i64(dashboard.gender.male)?,
            to_i64(dashboard.gender.female)?,
        ],
    )?;

    let emotion = &dashboard.emotion;
    tx.execute(
        "INSERT INTO emotion_distribution (neutral, serious, happy, surprised)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            to_i64(emotion.neutral)?,
            to_i64(emotion.serious)?,
            to_i64(emotion.happy)?,
            to_i64(emotion.surprised)?,
        ],
    )?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO advertisement (ad_name, total_viewers, look_yes, look_no)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for ad in ads {
            stmt.execute(params![
                ad.ad_name,
                to_i64(ad.total_viewers)?,
                to_i64(ad.look_yes)?,
                to_i64(ad.look_no)?,
            ])?;
        }
    }

    tx.commit()
}
