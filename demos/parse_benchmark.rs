use anyhow::Result;
use ee_metadata::{parse_metadata_file, ScenePoint};
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    // ログの初期化
    tracing_subscriber::fmt::init();

    // 環境変数でテスト用XMLファイルのパスを指定
    let test_xml = std::env::var("TEST_XML_PATH")
        .unwrap_or_else(|_| "test_dir/LE70820552011359EDC00.xml".to_string());

    let xml_path = Path::new(&test_xml);

    if !xml_path.exists() {
        eprintln!("Test XML file not found: {}", test_xml);
        eprintln!("Set TEST_XML_PATH environment variable to specify test file");
        return Ok(());
    }

    println!("Benchmarking metadata parsing: {}", test_xml);

    let mut durations = Vec::new();
    let mut record = None;

    for run in 1..=3 {
        let start = Instant::now();
        let parsed = parse_metadata_file(xml_path)?;
        let duration = start.elapsed();

        println!("Run {}: {:?}", run, duration);
        durations.push(duration);

        // 毎回同じ結果になることを確認
        if let Some(previous) = &record {
            anyhow::ensure!(previous == &parsed, "run {} produced a different record", run);
        }
        record = Some(parsed);
    }

    // 平均時間を計算
    let avg_duration = durations.iter().sum::<std::time::Duration>() / durations.len() as u32;
    println!("Average processing time: {:?}", avg_duration);

    if let Some(record) = record {
        println!("Scene info:");
        println!("  Entity ID: {}", record.entity_id());
        println!("  Acquired: {}", record.acquisition_date());
        println!("  WRS path/row: {}/{}", record.wrs_path(), record.wrs_row());
        println!(
            "  Sun azimuth/elevation: {:.2}/{:.2}",
            record.sun_azimuth(),
            record.sun_elevation()
        );
        for which in ScenePoint::ALL {
            let point = record.point(which);
            println!(
                "  {:?}: {} {} ({:.6}, {:.6})",
                which,
                point.latitude.raw(),
                point.longitude.raw(),
                point.latitude.decimal(),
                point.longitude.decimal()
            );
        }
        println!("  Browse: {}", record.browse_link());
    }

    Ok(())
}
