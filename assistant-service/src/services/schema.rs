//! Hard-coded warehouse schema and the SQL templates for the whitelisted
//! query shapes.
//!
//! Only fixed fragments are ever substituted into a template (`{table}`
//! from configuration, `{year_clause}` as a constant string); user values
//! travel exclusively as bound parameters.

use crate::models::QueryType;

/// Columns of the historical flights table: (name, type, description).
/// All fields are nullable.
pub const COLUMNS: &[(&str, &str, &str)] = &[
    ("id", "INTEGER", "Unique flight identifier"),
    ("year", "INTEGER", "Year of flight"),
    ("month", "INTEGER", "Month of flight (1-12)"),
    ("day", "INTEGER", "Day of flight (1-31)"),
    ("dep_time", "FLOAT", "Actual departure time"),
    ("sched_dep_time", "INTEGER", "Scheduled departure time"),
    ("dep_delay", "FLOAT", "Departure delay in minutes"),
    ("arr_time", "FLOAT", "Actual arrival time"),
    ("sched_arr_time", "INTEGER", "Scheduled arrival time"),
    ("arr_delay", "FLOAT", "Arrival delay in minutes"),
    ("carrier", "STRING", "Airline carrier code"),
    ("flight", "INTEGER", "Flight number"),
    ("tailnum", "STRING", "Aircraft tail number"),
    ("origin", "STRING", "Origin airport code"),
    ("dest", "STRING", "Destination airport code"),
    ("air_time", "FLOAT", "Flight time in minutes"),
    ("distance", "INTEGER", "Distance in miles"),
    ("hour", "INTEGER", "Hour of flight (0-23)"),
    ("minute", "INTEGER", "Minute of flight (0-59)"),
    ("time_hour", "TIMESTAMP", "Timestamp of flight"),
    ("name", "STRING", "Airline name"),
];

/// True when `name` is a column of the flights table.
pub fn is_column(name: &str) -> bool {
    COLUMNS.iter().any(|(col, _, _)| *col == name)
}

/// Schema description handed to the LLM validator.
pub fn schema_prompt() -> String {
    let mut out = String::from(
        "Table: flights (historical flight performance)\nSchema:\n",
    );
    for (name, column_type, description) in COLUMNS {
        out.push_str(&format!("{} NULLABLE {} - {}\n", name, column_type, description));
    }
    out.push_str(
        "\nNote: all fields are NULLABLE; queries use COALESCE or IS NOT NULL checks.\n\
         The table holds no price or fare data.\n",
    );
    out
}

const ON_TIME_AIRLINES_SQL: &str = "\
SELECT
    carrier,
    name AS airline_name,
    COUNT(*) AS total_flights,
    AVG(COALESCE(dep_delay, 0)) AS avg_dep_delay,
    AVG(COALESCE(arr_delay, 0)) AS avg_arr_delay,
    AVG((COALESCE(dep_delay, 0) + COALESCE(arr_delay, 0)) / 2) AS avg_overall_delay,
    SUM(CASE WHEN COALESCE(arr_delay, 0) <= 15 THEN 1 ELSE 0 END) / COUNT(*) * 100 AS on_time_percentage
FROM {table}
WHERE origin = @origin
    AND dest = @dest
    AND carrier IS NOT NULL
    AND name IS NOT NULL
    {year_clause}
GROUP BY carrier, name
HAVING COUNT(*) >= 10
ORDER BY avg_overall_delay ASC, on_time_percentage DESC
LIMIT @limit";

const AVERAGE_DELAY_SQL: &str = "\
SELECT
    COUNT(*) AS total_flights,
    AVG(COALESCE(dep_delay, 0)) AS avg_dep_delay,
    AVG(COALESCE(arr_delay, 0)) AS avg_arr_delay,
    AVG((COALESCE(dep_delay, 0) + COALESCE(arr_delay, 0)) / 2) AS avg_overall_delay
FROM {table}
WHERE origin = @origin
    AND dest = @dest
    {year_clause}";

const DAY_OF_WEEK_DELAYS_SQL: &str = "\
SELECT
    EXTRACT(DAYOFWEEK FROM DATE(year, month, day)) AS day_of_week,
    COUNT(*) AS total_flights,
    AVG(COALESCE(dep_delay, 0)) AS avg_dep_delay,
    AVG(COALESCE(arr_delay, 0)) AS avg_arr_delay,
    AVG((COALESCE(dep_delay, 0) + COALESCE(arr_delay, 0)) / 2) AS avg_overall_delay,
    SUM(CASE WHEN COALESCE(arr_delay, 0) <= 15 THEN 1 ELSE 0 END) / COUNT(*) * 100 AS on_time_percentage
FROM {table}
WHERE origin = @origin
    AND dest = @dest
    AND year IS NOT NULL
    AND month IS NOT NULL
    AND day IS NOT NULL
    {year_clause}
GROUP BY day_of_week
HAVING COUNT(*) >= 5
ORDER BY avg_overall_delay ASC";

/// Fixed SQL template for a whitelisted query shape.
pub fn sql_template(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::OnTimeAirlines => ON_TIME_AIRLINES_SQL,
        QueryType::AverageDelay => AVERAGE_DELAY_SQL,
        QueryType::DayOfWeekDelays => DAY_OF_WEEK_DELAYS_SQL,
    }
}

/// Result columns rendered for each query shape, in display order.
pub fn display_columns(query_type: QueryType) -> &'static [&'static str] {
    match query_type {
        QueryType::OnTimeAirlines => &[
            "carrier",
            "airline_name",
            "total_flights",
            "on_time_percentage",
            "avg_overall_delay",
        ],
        QueryType::AverageDelay => &[
            "total_flights",
            "avg_dep_delay",
            "avg_arr_delay",
            "avg_overall_delay",
        ],
        QueryType::DayOfWeekDelays => &[
            "day_of_week",
            "total_flights",
            "avg_overall_delay",
            "on_time_percentage",
        ],
    }
}
