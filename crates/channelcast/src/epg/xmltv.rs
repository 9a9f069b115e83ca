//! Serializes cached EPG programs into an XMLTV document for `/xmltv.xml`.

use serde::Serialize;

use crate::errors::{AppResult, RuntimeError};
use crate::models::{Channel, EpgProgram};

const XMLTV_TIME_FORMAT: &str = "%Y%m%d%H%M%S %z";
const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

#[derive(Serialize)]
#[serde(rename = "tv")]
struct Tv {
    #[serde(rename = "channel")]
    channels: Vec<XmltvChannel>,
    #[serde(rename = "programme")]
    programmes: Vec<XmltvProgramme>,
}

#[derive(Serialize)]
struct XmltvChannel {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "display-name")]
    display_name: String,
}

#[derive(Serialize)]
struct XmltvProgramme {
    #[serde(rename = "@start")]
    start: String,
    #[serde(rename = "@stop")]
    stop: String,
    #[serde(rename = "@channel")]
    channel: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
}

/// Serializes `programs` (already resolved per channel) into an XMLTV document.
pub fn export_xmltv(channels: &[(Channel, Vec<EpgProgram>)]) -> AppResult<String> {
    let tv = Tv {
        channels: channels
            .iter()
            .map(|(channel, _)| XmltvChannel {
                id: channel.slug.clone(),
                display_name: channel.name.clone(),
            })
            .collect(),
        programmes: channels
            .iter()
            .flat_map(|(channel, programs)| {
                programs.iter().map(move |program| XmltvProgramme {
                    start: program.start_time.format(XMLTV_TIME_FORMAT).to_string(),
                    stop: program.end_time.format(XMLTV_TIME_FORMAT).to_string(),
                    channel: channel.slug.clone(),
                    title: program.title.clone(),
                    desc: program.description.clone(),
                    category: program.category.clone(),
                })
            })
            .collect(),
    };

    let body = quick_xml::se::to_string(&tv)
        .map_err(|e| RuntimeError::io_failure(format!("failed to serialize xmltv: {e}")))?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn exports_channel_and_programme_elements() {
        let channel = Channel::new("news", "News", "/data/news");
        let program = EpgProgram {
            id: Uuid::new_v4(),
            channel_id: channel.id,
            start_time: Utc::now(),
            end_time: Utc::now() + chrono::Duration::minutes(30),
            title: "Morning Report".to_string(),
            description: None,
            category: None,
            episode_num: None,
        };
        let xml = export_xmltv(&[(channel, vec![program])]).unwrap();
        assert!(xml.contains("<tv>"));
        assert!(xml.contains("Morning Report"));
        assert!(xml.contains("id=\"news\""));
    }
}
