use std::fmt;

use crate::bibtex::PaperInfo;

const TITLE_PLACEHOLDER: &str = "Title not detected";
const LINK_PLACEHOLDER: &str = "No link detected";

/// What the preview pane shows for the current BibTeX text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub title: String,
    pub meeting: String,
    pub year: String,
    pub conference: String,
    /// `None` keeps the link placeholder visible.
    pub link: Option<String>,
    /// `None` hides the PDF link display.
    pub pdf_link: Option<String>,
}

impl Preview {
    pub fn from_info(info: &PaperInfo) -> Self {
        Self {
            title: info
                .title
                .clone()
                .unwrap_or_else(|| TITLE_PLACEHOLDER.to_string()),
            meeting: info.meeting.clone(),
            year: info.year.clone(),
            conference: info.conference.clone(),
            link: info.url.clone(),
            pdf_link: info.pdf_link.clone(),
        }
    }
}

/// Parse `text` and build the preview for it. The parsed info is returned so the
/// caller can reuse it.
pub fn render(text: &str, pdf: Option<&str>) -> (PaperInfo, Preview) {
    let info = PaperInfo::from_bibtex(text).with_pdf_link(pdf.map(str::to_string));
    let preview = Preview::from_info(&info);
    (info, preview)
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title:      {}", self.title)?;
        writeln!(f, "Meeting:    {}", self.meeting)?;
        writeln!(f, "Year:       {}", self.year)?;
        writeln!(f, "Conference: {}", self.conference)?;
        match &self.link {
            Some(link) => writeln!(f, "Link:       {}", link)?,
            None => writeln!(f, "Link:       {}", LINK_PLACEHOLDER)?,
        }
        if let Some(pdf) = &self.pdf_link {
            writeln!(f, "PDF:        {}", pdf)?;
        }
        Ok(())
    }
}
