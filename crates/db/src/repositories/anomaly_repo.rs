//! Repository for the `anomalies` audit table.

use aquamine_core::scoring::AnomalyResult;
use sqlx::PgConnection;

pub struct AnomalyRepo;

impl AnomalyRepo {
    /// Insert a batch of anomalies in one statement. Returns the row count.
    pub async fn insert_many(
        conn: &mut PgConnection,
        anomalies: &[AnomalyResult],
    ) -> Result<u64, sqlx::Error> {
        if anomalies.is_empty() {
            return Ok(0);
        }

        let mut sensor_ids = Vec::with_capacity(anomalies.len());
        let mut recorded_at = Vec::with_capacity(anomalies.len());
        let mut parameters = Vec::with_capacity(anomalies.len());
        let mut values = Vec::with_capacity(anomalies.len());
        let mut severities = Vec::with_capacity(anomalies.len());
        let mut scores = Vec::with_capacity(anomalies.len());
        let mut methods = Vec::with_capacity(anomalies.len());
        let mut reasons = Vec::with_capacity(anomalies.len());
        for a in anomalies {
            sensor_ids.push(a.sensor_id.clone());
            recorded_at.push(a.timestamp);
            parameters.push(a.parameter.as_str().to_string());
            values.push(a.value);
            severities.push(a.severity.as_str().to_string());
            scores.push(a.score);
            methods.push(a.method.clone());
            reasons.push(a.reason.clone());
        }

        let result = sqlx::query(
            "INSERT INTO anomalies \
                (sensor_id, recorded_at, parameter, value, severity, score, method, reason) \
             SELECT * FROM UNNEST($1::text[], $2::timestamptz[], $3::text[], $4::float8[], \
                                  $5::text[], $6::float8[], $7::text[], $8::text[])",
        )
        .bind(&sensor_ids)
        .bind(&recorded_at)
        .bind(&parameters)
        .bind(&values)
        .bind(&severities)
        .bind(&scores)
        .bind(&methods)
        .bind(&reasons)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
