//! End-to-end pipeline runs over small raw datasets on disk.

use chrono::NaiveDate;
use starmart::prelude::*;
use std::fs;
use std::path::Path;

const DIM_DATE_HEADER: &str =
    "date_key,full_date,day_of_month,week_number,month_number,quarter,year,is_weekend,is_holiday";
const FACT_HEADER: &str = "sales_key,order_id,line_number,date_key,product_key,customer_key,\
                           region_key,employee_key,quantity,unit_price,discount_pct,cogs,\
                           target_amount,order_status,channel,created_at,updated_at";

fn write_dimensions(raw_dir: &Path) {
    fs::write(
        raw_dir.join("dim_date.csv"),
        format!("{DIM_DATE_HEADER}\n20240105,2024-01-05,5,1,1,Q1,2024,false,false\n"),
    )
    .unwrap();
    fs::write(
        raw_dir.join("dim_product.csv"),
        "product_key,product_id,product_name,category,sub_category,brand,unit_cost,list_price,is_active,launch_date\n\
         1,PRD-0001,Server Rack,Hardware,Servers,TechCorp,850.00,1500.00,True,2021-03-01\n",
    )
    .unwrap();
    fs::write(
        raw_dir.join("dim_customer.csv"),
        "customer_key,customer_id,customer_name,segment,industry,email,acquisition_date,is_active\n\
         1,CUS-0001,acme global,enterprise,Manufacturing,ops@acme.test,2020-05-01,True\n",
    )
    .unwrap();
    fs::write(
        raw_dir.join("dim_employee.csv"),
        "employee_key,employee_id,full_name,department,job_title,manager_id,hire_date,region_key,is_active\n\
         1,EMP-0001,Dana Reyes,Sales,Account Executive,EMP-0009,2019-02-11,1,True\n",
    )
    .unwrap();
    fs::write(
        raw_dir.join("dim_region.csv"),
        "region_key,country,region,sub_region,city,currency\n\
         1,United States,North America,Northeast US,New York,USD\n",
    )
    .unwrap();
}

fn write_fact(raw_dir: &Path, rows: &[&str]) {
    let mut contents = format!("{FACT_HEADER}\n");
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    fs::write(raw_dir.join("fact_sales.csv"), contents).unwrap();
}

fn good_fact_row() -> &'static str {
    "1,ORD-1001,1,20240105,1,1,1,1,5,1350.00,0.10,4250.00,6000.00,Delivered,Direct,\
     2024-01-05 09:00:00,2024-01-05 10:00:00"
}

fn config(raw_dir: &Path, processed_dir: &Path) -> PipelineConfig {
    let validation = ValidationConfig {
        as_of: NaiveDate::from_ymd_opt(2024, 2, 1),
        ..Default::default()
    };
    PipelineConfig::new(raw_dir, processed_dir).with_validation(validation)
}

#[tokio::test]
async fn clean_dataset_commits_with_derived_measures() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("raw");
    let processed_dir = dir.path().join("processed");
    fs::create_dir_all(&raw_dir).unwrap();
    write_dimensions(&raw_dir);
    write_fact(&raw_dir, &[good_fact_row()]);

    let outcome = Pipeline::new(config(&raw_dir, &processed_dir))
        .run()
        .await
        .unwrap();

    assert!(outcome.report.passed(), "{:?}", outcome.report.metrics);
    assert!(outcome.committed);
    assert!(outcome.transform_issues.is_empty());

    let fact = fs::read_to_string(processed_dir.join("fact_sales.csv")).unwrap();
    // 5 * 1350.00 * 0.9 = 6075.00; margin 1825.00; attainment 101.25.
    assert!(fact.contains("6075"), "{fact}");
    assert!(fact.contains("1825"), "{fact}");
    assert!(fact.contains("101.25"), "{fact}");
    assert!(fact.contains("true"), "{fact}");

    // Customer normalization made it into the published dimension.
    let customers = fs::read_to_string(processed_dir.join("dim_customer.csv")).unwrap();
    assert!(customers.contains("Acme Global"), "{customers}");
    assert!(customers.contains("Enterprise"), "{customers}");
}

#[tokio::test]
async fn cancelled_order_is_not_revenue_eligible() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("raw");
    let processed_dir = dir.path().join("processed");
    fs::create_dir_all(&raw_dir).unwrap();
    write_dimensions(&raw_dir);
    write_fact(
        &raw_dir,
        &[
            good_fact_row(),
            "2,ORD-1002,1,20240105,1,1,1,1,2,400.00,0.00,350.00,1000.00,Cancelled,Online,\
             2024-01-05 09:00:00,2024-01-05 11:00:00",
        ],
    );

    let outcome = Pipeline::new(config(&raw_dir, &processed_dir))
        .run()
        .await
        .unwrap();
    assert!(outcome.committed);

    let fact = fs::read_to_string(processed_dir.join("fact_sales.csv")).unwrap();
    let cancelled_line = fact
        .lines()
        .find(|l| l.contains("ORD-1002"))
        .expect("cancelled row published");
    assert!(cancelled_line.contains("false"), "{cancelled_line}");
}

#[tokio::test]
async fn orphan_foreign_key_blocks_commit_and_preserves_previous_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("raw");
    let processed_dir = dir.path().join("processed");
    fs::create_dir_all(&raw_dir).unwrap();
    write_dimensions(&raw_dir);
    write_fact(&raw_dir, &[good_fact_row()]);

    // First run publishes a good dataset.
    let outcome = Pipeline::new(config(&raw_dir, &processed_dir))
        .run()
        .await
        .unwrap();
    assert!(outcome.committed);
    let published = fs::read(processed_dir.join("fact_sales.csv")).unwrap();

    // Second run references a product that does not exist.
    write_fact(
        &raw_dir,
        &[
            good_fact_row(),
            "2,ORD-1003,1,20240105,99,1,1,1,3,200.00,0.00,450.00,,Open,Partner,\
             2024-01-06 09:00:00,2024-01-06 09:00:00",
        ],
    );
    let outcome = Pipeline::new(config(&raw_dir, &processed_dir))
        .run()
        .await
        .unwrap();

    assert!(!outcome.report.passed());
    assert!(!outcome.committed);
    let fk_failure = outcome
        .report
        .failures()
        .find(|r| r.id == "fk.fact_sales.product_key")
        .expect("orphan product key reported");
    assert_eq!(fk_failure.samples, vec!["2"]);
    // The transform already surfaced the orphan before validation ran.
    assert!(outcome
        .transform_issues
        .iter()
        .any(|i| i.kind == IssueKind::ForeignKey && i.column.as_deref() == Some("product_key")));

    // The previously published dataset is byte-for-byte intact.
    let still_published = fs::read(processed_dir.join("fact_sales.csv")).unwrap();
    assert_eq!(published, still_published);
    assert!(!dir.path().join("processed.staging").exists());
}

#[tokio::test]
async fn empty_fact_table_passes_vacuously() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("raw");
    let processed_dir = dir.path().join("processed");
    fs::create_dir_all(&raw_dir).unwrap();
    write_dimensions(&raw_dir);
    write_fact(&raw_dir, &[]);

    let outcome = Pipeline::new(config(&raw_dir, &processed_dir))
        .run()
        .await
        .unwrap();

    // Row-level checks have nothing to fail on; only the advisory row
    // count minimum complains.
    assert!(outcome.report.passed());
    assert!(outcome.committed);
    assert!(outcome
        .report
        .records
        .iter()
        .any(|r| r.id == "row_count.fact_sales" && r.status == CheckStatus::Failed));
}

#[tokio::test]
async fn repeated_runs_publish_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("raw");
    let processed_dir = dir.path().join("processed");
    fs::create_dir_all(&raw_dir).unwrap();
    write_dimensions(&raw_dir);
    write_fact(&raw_dir, &[good_fact_row()]);

    let pipeline = Pipeline::new(config(&raw_dir, &processed_dir));
    pipeline.run().await.unwrap();
    let first = fs::read(processed_dir.join("fact_sales.csv")).unwrap();
    pipeline.run().await.unwrap();
    let second = fs::read(processed_dir.join("fact_sales.csv")).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn missing_raw_table_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("raw");
    let processed_dir = dir.path().join("processed");
    fs::create_dir_all(&raw_dir).unwrap();
    write_dimensions(&raw_dir);
    // No fact_sales.csv at all.

    let err = Pipeline::new(config(&raw_dir, &processed_dir))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, EtlError::MissingTable { .. }));
    assert!(!processed_dir.exists());
}

#[tokio::test]
async fn bad_cells_become_issues_not_failures_of_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("raw");
    let processed_dir = dir.path().join("processed");
    fs::create_dir_all(&raw_dir).unwrap();
    write_dimensions(&raw_dir);
    write_fact(
        &raw_dir,
        &[
            good_fact_row(),
            // quantity is unparseable; the row is dropped as a null measure.
            "2,ORD-1004,1,20240105,1,1,1,1,many,200.00,0.00,150.00,,Open,Direct,\
             2024-01-05 09:00:00,2024-01-05 09:00:00",
        ],
    );

    let outcome = Pipeline::new(config(&raw_dir, &processed_dir))
        .run()
        .await
        .unwrap();

    assert!(outcome.committed);
    assert!(outcome
        .transform_issues
        .iter()
        .any(|i| i.kind == IssueKind::Coercion && i.column.as_deref() == Some("quantity")));
    assert!(outcome
        .transform_issues
        .iter()
        .any(|i| i.kind == IssueKind::NullMeasure));

    let fact = fs::read_to_string(processed_dir.join("fact_sales.csv")).unwrap();
    assert!(!fact.contains("ORD-1004"), "{fact}");
}
