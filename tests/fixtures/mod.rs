//! Sample import data shared by the integration and E2E tests

use adreport_client::services::imports::ImportFile;

/// Three rows in the server's internal column naming.
pub const SAMPLE_CSV: &str = "\
date,mobile_app_resolved_id,mobile_app_name,domain,ad_unit_name,ad_unit_id,inventory_format_name,operating_system_version_name,ad_exchange_total_requests,ad_exchange_responses_served,ad_exchange_match_rate,ad_exchange_line_item_level_impressions,ad_exchange_line_item_level_clicks,ad_exchange_line_item_level_ctr,average_ecpm,payout
2023-01-01,app123,Test App,example.com,Banner Ad,unit123,Banner,Android 12,1000,800,0.8,700,50,0.0714,1.5,1050.0
2023-01-02,app124,Another App,test.com,Interstitial,unit124,Interstitial,iOS 15,1500,1200,0.8,1000,75,0.075,2.0,2000.0
2023-01-03,app125,Third App,demo.com,Rewarded Video,unit125,Rewarded,iOS 14,2000,1600,0.8,1400,100,0.0714,2.5,3500.0
";

pub const SAMPLE_ROWS: u64 = 3;

pub fn sample_csv() -> ImportFile {
    ImportFile::new("sample.csv", SAMPLE_CSV.as_bytes().to_vec())
}
