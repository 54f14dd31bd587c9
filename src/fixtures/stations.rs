//! Delhi-NCR monitoring stations used as the terminal acquisition fallback.

use crate::models::{Pollutants, Station, StationType};

use StationType::{Government, Industrial, PranameshDevice};

// ---

const FIXTURE_TIMESTAMP: &str = "2025-12-07T23:00:00";

/// `(id, name, location, lat, lng, aqi, [pm25, pm10, co, no2, so2, o3], type)`
type Row = (
    &'static str,
    &'static str,
    &'static str,
    f64,
    f64,
    i32,
    [f64; 6],
    StationType,
);

#[rustfmt::skip]
const ROWS: &[Row] = &[
    ("aicte-delhi", "AICTE Delhi", "Nelson Mandela Marg, Vasant Kunj", 28.5355, 77.1539, 187, [112.0, 198.0, 1.2, 48.0, 12.0, 34.0], PranameshDevice),
    ("ito", "ITO", "Income Tax Office, Delhi", 28.6289, 77.2405, 312, [234.0, 356.0, 2.1, 78.0, 28.0, 45.0], Government),
    ("anand-vihar", "Anand Vihar", "Anand Vihar ISBT, Delhi", 28.6469, 77.3164, 389, [298.0, 445.0, 2.8, 92.0, 35.0, 52.0], Government),
    ("dwarka-sec8", "Dwarka Sector 8", "Dwarka Sector 8, Delhi", 28.5744, 77.0658, 156, [89.0, 167.0, 0.9, 38.0, 14.0, 28.0], Government),
    ("rohini", "Rohini", "Rohini, Delhi", 28.7495, 77.0565, 245, [178.0, 289.0, 1.8, 65.0, 22.0, 41.0], Government),
    ("punjabi-bagh", "Punjabi Bagh", "Punjabi Bagh, West Delhi", 28.6683, 77.1167, 278, [198.0, 312.0, 2.0, 72.0, 25.0, 38.0], Government),
    ("mandir-marg", "Mandir Marg", "Mandir Marg, Central Delhi", 28.6362, 77.2010, 198, [124.0, 215.0, 1.4, 52.0, 18.0, 32.0], Government),
    ("r-k-puram", "R.K. Puram", "R.K. Puram, South Delhi", 28.5651, 77.1744, 167, [98.0, 178.0, 1.1, 42.0, 15.0, 30.0], Government),
    ("mundka", "Mundka", "Mundka Industrial Area", 28.6814, 77.0324, 334, [256.0, 398.0, 2.5, 85.0, 42.0, 48.0], Industrial),
    ("okhla-phase2", "Okhla Phase 2", "Okhla Industrial Area Phase 2", 28.5306, 77.2711, 298, [218.0, 345.0, 2.2, 78.0, 38.0, 44.0], Industrial),
    ("narela", "Narela", "Narela Industrial Area", 28.8526, 77.0931, 356, [278.0, 412.0, 2.6, 88.0, 45.0, 50.0], Industrial),
    ("bawana", "Bawana", "Bawana Industrial Area", 28.7762, 77.0344, 312, [238.0, 367.0, 2.3, 82.0, 40.0, 46.0], Industrial),
    ("lodhi-road", "Lodhi Road", "Lodhi Road, Central Delhi", 28.5918, 77.2273, 145, [78.0, 156.0, 0.8, 35.0, 12.0, 26.0], Government),
    ("north-campus", "North Campus DU", "Delhi University, North Campus", 28.6877, 77.2100, 189, [115.0, 201.0, 1.3, 49.0, 16.0, 33.0], Government),
    ("shadipur", "Shadipur", "Shadipur Depot, West Delhi", 28.6519, 77.1473, 234, [165.0, 278.0, 1.7, 62.0, 21.0, 39.0], Government),
    ("sirifort", "Siri Fort", "Siri Fort, South Delhi", 28.5503, 77.2155, 178, [105.0, 189.0, 1.2, 45.0, 14.0, 31.0], Government),
    ("jahangirpuri", "Jahangirpuri", "Jahangirpuri, North Delhi", 28.7256, 77.1668, 267, [189.0, 301.0, 1.9, 68.0, 24.0, 40.0], Government),
    ("wazirpur", "Wazirpur", "Wazirpur Industrial Area", 28.6997, 77.1656, 345, [267.0, 401.0, 2.4, 86.0, 43.0, 49.0], Industrial),
    ("patparganj", "Patparganj", "Patparganj Industrial Area", 28.6235, 77.2878, 289, [209.0, 334.0, 2.1, 76.0, 36.0, 43.0], Industrial),
    ("ashok-vihar", "Ashok Vihar", "Ashok Vihar, North Delhi", 28.6953, 77.1818, 223, [156.0, 267.0, 1.6, 58.0, 20.0, 37.0], Government),
    ("vivek-vihar", "Vivek Vihar", "Vivek Vihar, East Delhi", 28.6722, 77.3147, 301, [228.0, 356.0, 2.2, 79.0, 34.0, 45.0], Government),
    ("nehru-nagar", "Nehru Nagar", "Nehru Nagar, East Delhi", 28.6478, 77.2712, 256, [182.0, 298.0, 1.8, 67.0, 23.0, 41.0], Government),
    ("major-dhyan-chand", "Major Dhyan Chand Stadium", "India Gate, Central Delhi", 28.6117, 77.2378, 167, [98.0, 178.0, 1.0, 41.0, 13.0, 29.0], Government),
    ("alipur", "Alipur", "Alipur, North Delhi", 28.7943, 77.1528, 234, [167.0, 278.0, 1.7, 61.0, 21.0, 38.0], Government),
    ("pusa", "PUSA DPCC", "IARI, Pusa Road", 28.6393, 77.1462, 189, [118.0, 203.0, 1.3, 48.0, 16.0, 32.0], Government),
    ("dilshad-garden", "Dilshad Garden", "Dilshad Garden, East Delhi", 28.6789, 77.3178, 278, [198.0, 312.0, 2.0, 71.0, 27.0, 42.0], Government),
    ("sonia-vihar", "Sonia Vihar", "Sonia Vihar, North East Delhi", 28.7123, 77.2567, 312, [238.0, 367.0, 2.3, 81.0, 32.0, 46.0], Government),
    ("burari", "Burari Crossing", "Burari, North Delhi", 28.7512, 77.1945, 289, [212.0, 334.0, 2.1, 74.0, 29.0, 43.0], Government),
    ("dr-karni-singh", "Dr. Karni Singh Shooting Range", "Tughlakabad, South Delhi", 28.4987, 77.2654, 198, [125.0, 212.0, 1.4, 51.0, 17.0, 34.0], Government),
    ("aya-nagar", "Aya Nagar", "Aya Nagar, South Delhi", 28.4689, 77.1312, 145, [76.0, 154.0, 0.8, 34.0, 11.0, 25.0], Government),
    ("najafgarh", "Najafgarh", "Najafgarh, South West Delhi", 28.6092, 76.9798, 178, [108.0, 189.0, 1.1, 44.0, 15.0, 30.0], Government),
    ("jawaharlal-nehru-stadium", "JLN Stadium", "Lodhi Road, Central Delhi", 28.5829, 77.2332, 156, [89.0, 167.0, 0.9, 39.0, 13.0, 28.0], Government),
];

/// Build the fixture station list. Status is derived from each row's AQI.
pub fn stations() -> Vec<Station> {
    // ---
    ROWS.iter()
        .map(|&(id, name, location, lat, lng, aqi, p, kind)| {
            let mut pollutants = Pollutants::core(p[0], p[1], p[2], p[3], p[4], p[5]);
            if id == "aicte-delhi" {
                pollutants.voc = Some(0.8);
            }
            Station::new(id, aqi, kind)
                .named(name, location)
                .at(lat, lng)
                .with_pollutants(pollutants)
                .updated_at(FIXTURE_TIMESTAMP)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    // ---
    use std::collections::HashSet;

    use super::*;
    use crate::aqi::classify;

    #[test]
    fn test_fixture_ids_unique_and_status_derived() {
        // ---
        let stations = stations();
        assert_eq!(stations.len(), ROWS.len());

        let ids: HashSet<_> = stations.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), stations.len(), "duplicate fixture id");

        for s in &stations {
            assert_eq!(s.status(), classify(s.aqi()), "{} status drifted", s.id);
            assert!(s.lat > 28.0 && s.lng > 76.0, "{} outside Delhi-NCR", s.id);
        }
    }
}
