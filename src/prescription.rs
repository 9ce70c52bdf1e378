//! Printable prescription for a consultation.
//!
//! `PrescriptionDocument` gathers the text from a patient and one of their
//! consultations; `render_pdf` lays it out on A5 pages. The diagnosis and
//! instructions flow onto continuation pages when they do not fit above
//! the signature block, which is drawn once on the last page.

use std::io::BufWriter;

use chrono::NaiveDate;
use printpdf::path::PaintMode;
use printpdf::*;
use serde::Serialize;
use thiserror::Error;

use crate::gestation::age_in_years;
use crate::models::{Consultation, Patient};

const PAGE_WIDTH: f32 = 148.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 12.0;
const WRAP_CHARS: usize = 70;
/// Lowest baseline before content would run into the signature block.
const CONTENT_FLOOR: f32 = 45.0;
/// First baseline on a continuation page, below its short header.
const CONTINUATION_TOP: f32 = PAGE_HEIGHT - MARGIN - 10.0;
const HEADING_ADVANCE: f32 = 5.5;
const LINE_ADVANCE: f32 = 4.5;

#[derive(Error, Debug)]
pub enum PrescriptionError {
    #[error("PDF font error: {0}")]
    Font(String),

    #[error("PDF save error: {0}")]
    Save(String),

    #[error("PDF buffer error: {0}")]
    Buffer(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionDocument {
    pub clinic_name: String,
    pub branch: String,
    pub issued_on: NaiveDate,
    pub patient_name: String,
    pub national_id: String,
    pub patient_age: i32,
    pub consultation_type: String,
    pub vitals_line: Option<String>,
    pub diagnosis: String,
    pub instructions: String,
    pub staff_name: String,
}

impl PrescriptionDocument {
    pub fn from_records(
        clinic_name: &str,
        patient: &Patient,
        consultation: &Consultation,
        staff_name: &str,
    ) -> Self {
        let issued_on = consultation.consulted_at.date_naive();
        Self {
            clinic_name: clinic_name.to_string(),
            branch: patient.branch.clone(),
            issued_on,
            patient_name: patient.full_name(),
            national_id: patient.national_id.clone(),
            patient_age: age_in_years(patient.birth_date, issued_on),
            consultation_type: consultation.consultation_type.as_str().replace('_', " "),
            vitals_line: vitals_line(consultation),
            diagnosis: consultation
                .diagnosis
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "Sin diagnóstico registrado".to_string()),
            instructions: consultation
                .instructions
                .clone()
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| "Sin indicaciones".to_string()),
            staff_name: staff_name.to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("receta-{}-{}.pdf", self.national_id, self.issued_on.format("%Y%m%d"))
    }
}

fn vitals_line(consultation: &Consultation) -> Option<String> {
    let v = &consultation.vitals;
    let mut parts = Vec::new();
    if let Some(bp) = &v.blood_pressure {
        parts.push(format!("PA {bp} mmHg"));
    }
    if let Some(w) = v.weight_kg {
        parts.push(format!("Peso {w:.1} kg"));
    }
    if let Some(t) = v.temperature_c {
        parts.push(format!("T {t:.1} °C"));
    }
    if let Some(hr) = v.heart_rate {
        parts.push(format!("FC {hr} lpm"));
    }
    if let Some(au) = v.uterine_height_cm {
        parts.push(format!("AU {au:.0} cm"));
    }
    if let Some(fcf) = v.fetal_heart_rate {
        parts.push(format!("FCF {fcf} lpm"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" · "))
    }
}

/// A body line with its page (0-based) and position.
#[derive(Debug, Clone, PartialEq)]
struct PlacedLine {
    page: usize,
    x: f32,
    y: f32,
    size: f32,
    bold: bool,
    text: String,
}

#[derive(Debug)]
struct BodyLayout {
    lines: Vec<PlacedLine>,
    pages: usize,
}

struct Cursor {
    page: usize,
    y: f32,
    lines: Vec<PlacedLine>,
}

impl Cursor {
    fn break_page(&mut self) {
        self.page += 1;
        self.y = CONTINUATION_TOP;
    }

    /// A heading moves to the next page unless one body line fits below it.
    fn heading(&mut self, text: &str) {
        if self.y - HEADING_ADVANCE < CONTENT_FLOOR {
            self.break_page();
        }
        self.push(text, MARGIN, 10.0, true);
        self.y -= HEADING_ADVANCE;
    }

    fn line(&mut self, text: String) {
        if self.y < CONTENT_FLOOR {
            self.break_page();
        }
        self.push(&text, MARGIN + 3.0, 9.0, false);
        self.y -= LINE_ADVANCE;
    }

    fn push(&mut self, text: &str, x: f32, size: f32, bold: bool) {
        self.lines.push(PlacedLine {
            page: self.page,
            x,
            y: self.y,
            size,
            bold,
            text: text.to_string(),
        });
    }
}

/// Positions the diagnosis and instruction blocks starting at `top` on the
/// first page. Every baseline stays at or above `CONTENT_FLOOR`.
fn layout_body(doc: &PrescriptionDocument, top: f32) -> BodyLayout {
    let mut cursor = Cursor {
        page: 0,
        y: top,
        lines: Vec::new(),
    };

    cursor.heading("DIAGNÓSTICO");
    for line in wrap_text(&doc.diagnosis, WRAP_CHARS) {
        cursor.line(line);
    }
    cursor.y -= 4.0;

    cursor.heading("INDICACIONES");
    for paragraph in doc.instructions.lines() {
        for line in wrap_text(paragraph, WRAP_CHARS) {
            cursor.line(line);
        }
    }

    BodyLayout {
        pages: cursor.page + 1,
        lines: cursor.lines,
    }
}

pub fn render_pdf(doc: &PrescriptionDocument) -> Result<Vec<u8>, PrescriptionError> {
    let title = format!("Receta - {}", doc.patient_name);
    let (pdf, page1, layer1) =
        PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let layer = pdf.get_page(page1).get_layer(layer1);
    let font = pdf
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| PrescriptionError::Font(e.to_string()))?;
    let bold = pdf
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| PrescriptionError::Font(e.to_string()))?;

    // Header band
    layer.set_fill_color(Color::Rgb(Rgb::new(0.76, 0.20, 0.45, None)));
    layer.add_rect(
        Rect::new(Mm(0.0), Mm(PAGE_HEIGHT - 28.0), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT))
            .with_mode(PaintMode::Fill),
    );
    layer.set_fill_color(Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None)));
    layer.use_text(&doc.clinic_name, 16.0, Mm(MARGIN), Mm(PAGE_HEIGHT - 14.0), &bold);
    layer.use_text(
        format!("Sede {}", doc.branch),
        9.0,
        Mm(MARGIN),
        Mm(PAGE_HEIGHT - 21.0),
        &font,
    );
    layer.use_text("RECETA", 12.0, Mm(PAGE_WIDTH - 35.0), Mm(PAGE_HEIGHT - 14.0), &bold);

    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    let mut y = PAGE_HEIGHT - 38.0;

    // Patient block
    layer.use_text(format!("Paciente: {}", doc.patient_name), 10.0, Mm(MARGIN), Mm(y), &bold);
    y -= 5.0;
    layer.use_text(
        format!("DNI: {}    Edad: {} años", doc.national_id, doc.patient_age),
        9.0,
        Mm(MARGIN),
        Mm(y),
        &font,
    );
    y -= 5.0;
    layer.use_text(
        format!(
            "Fecha: {}    Atención: {}",
            doc.issued_on.format("%d/%m/%Y"),
            doc.consultation_type
        ),
        9.0,
        Mm(MARGIN),
        Mm(y),
        &font,
    );
    y -= 5.0;
    if let Some(vitals) = &doc.vitals_line {
        for line in wrap_text(vitals, WRAP_CHARS) {
            layer.use_text(&line, 8.0, Mm(MARGIN), Mm(y), &font);
            y -= 4.0;
        }
    }

    y -= 2.0;
    draw_rule(&layer, y);
    y -= 7.0;

    let body = layout_body(doc, y);
    let mut layers = vec![layer];
    for index in 1..body.pages {
        let (page, page_layer) =
            pdf.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Layer {}", index + 1));
        let next = pdf.get_page(page).get_layer(page_layer);
        next.use_text(
            format!("{} · {} (continuación)", doc.clinic_name, doc.patient_name),
            8.0,
            Mm(MARGIN),
            Mm(PAGE_HEIGHT - MARGIN),
            &font,
        );
        draw_rule(&next, PAGE_HEIGHT - MARGIN - 3.0);
        layers.push(next);
    }

    for line in &body.lines {
        if let Some(target) = layers.get(line.page) {
            let face = if line.bold { &bold } else { &font };
            target.use_text(&line.text, line.size, Mm(line.x), Mm(line.y), face);
        }
    }

    if body.pages > 1 {
        for (index, target) in layers.iter().enumerate() {
            target.use_text(
                format!("Página {}/{}", index + 1, body.pages),
                7.0,
                Mm(PAGE_WIDTH - MARGIN - 18.0),
                Mm(8.0),
                &font,
            );
        }
    }

    if let Some(last) = layers.last() {
        draw_signature(last, &doc.staff_name, &font, &bold);
    }

    let mut buf = BufWriter::new(Vec::new());
    pdf.save(&mut buf)
        .map_err(|e| PrescriptionError::Save(e.to_string()))?;
    buf.into_inner()
        .map_err(|e| PrescriptionError::Buffer(e.to_string()))
}

fn draw_signature(
    layer: &PdfLayerReference,
    staff_name: &str,
    font: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    let sig_y = 30.0;
    let sig_left = PAGE_WIDTH - 70.0;
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(sig_left), Mm(sig_y)), false),
            (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(sig_y)), false),
        ],
        is_closed: false,
    });
    layer.use_text(staff_name, 9.0, Mm(sig_left), Mm(sig_y - 5.0), bold);
    layer.use_text("Firma y sello", 8.0, Mm(sig_left), Mm(sig_y - 9.5), font);
}

fn draw_rule(layer: &PdfLayerReference, y: f32) {
    layer.set_outline_thickness(0.3);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN), Mm(y)), false),
            (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(y)), false),
        ],
        is_closed: false,
    });
}

/// Greedy word wrap on whitespace. A word longer than `max_chars` gets a
/// line of its own. Always returns at least one line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = current.chars().count() + word.chars().count() + 1;
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConsultationType, PatientStatus, Sex, Vitals};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn patient() -> Patient {
        Patient {
            id: Uuid::new_v4(),
            first_name: "Rosa".into(),
            last_name: "Quispe".into(),
            national_id: "45678912".into(),
            birth_date: NaiveDate::from_ymd_opt(1995, 6, 15).unwrap(),
            sex: Sex::Female,
            phone: None,
            email: None,
            address: None,
            branch: "Central".into(),
            gravida: 2,
            para: 1,
            abortions: 0,
            cesareans: 0,
            last_menstrual_period: None,
            status: PatientStatus::Active,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn consultation(patient_id: Uuid) -> Consultation {
        Consultation {
            id: Uuid::new_v4(),
            patient_id,
            staff_id: Uuid::new_v4(),
            consulted_at: Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap(),
            consultation_type: ConsultationType::FamilyPlanning,
            motive: "Consejería".into(),
            diagnosis: Some("Z30.0 Consejo general sobre anticoncepción".into()),
            instructions: Some(
                "Ácido fólico 0.5 mg cada 24 horas por 30 días.\nControl en 4 semanas.".into(),
            ),
            vitals: Vitals {
                blood_pressure: Some("110/70".into()),
                weight_kg: Some(61.3),
                ..Default::default()
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn document_from_records() {
        let p = patient();
        let c = consultation(p.id);
        let doc = PrescriptionDocument::from_records("Clínica Materna", &p, &c, "Obst. Carmen Rojas");
        assert_eq!(doc.patient_name, "Rosa Quispe");
        assert_eq!(doc.patient_age, 31);
        assert_eq!(doc.consultation_type, "family planning");
        assert_eq!(doc.vitals_line.as_deref(), Some("PA 110/70 mmHg · Peso 61.3 kg"));
        assert_eq!(doc.file_name(), "receta-45678912-20261016.pdf");
    }

    #[test]
    fn missing_texts_get_placeholders() {
        let p = patient();
        let mut c = consultation(p.id);
        c.diagnosis = Some("  ".into());
        c.instructions = None;
        c.vitals = Vitals::default();
        let doc = PrescriptionDocument::from_records("Clínica", &p, &c, "Obst. Rojas");
        assert_eq!(doc.diagnosis, "Sin diagnóstico registrado");
        assert_eq!(doc.instructions, "Sin indicaciones");
        assert!(doc.vitals_line.is_none());
    }

    #[test]
    fn renders_pdf_bytes() {
        let p = patient();
        let c = consultation(p.id);
        let doc = PrescriptionDocument::from_records("Clínica Materna", &p, &c, "Obst. Carmen Rojas");
        let bytes = render_pdf(&doc).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_content_flows_onto_extra_pages() {
        let p = patient();
        let mut c = consultation(p.id);
        c.diagnosis = Some("O14.1 Preeclampsia severa con proteinuria persistente. ".repeat(36));
        c.instructions = Some(format!(
            "{}\nNifedipino 10 mg condicional.\n\n{}",
            "Reposo relativo. ".repeat(200),
            "Control de presión arterial cada 6 horas. ".repeat(30)
        ));
        let doc = PrescriptionDocument::from_records("Clínica", &p, &c, "Obst. Rojas");
        assert!(doc.diagnosis.chars().count() > 1900);

        let mut expected = vec!["DIAGNÓSTICO".to_string()];
        expected.extend(wrap_text(&doc.diagnosis, WRAP_CHARS));
        expected.push("INDICACIONES".to_string());
        for paragraph in doc.instructions.lines() {
            expected.extend(wrap_text(paragraph, WRAP_CHARS));
        }

        let body = layout_body(&doc, PAGE_HEIGHT - 70.0);
        let placed: Vec<&str> = body.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(placed, expected);
        assert!(body.pages > 2);
        assert_eq!(body.lines.last().map(|l| l.page + 1), Some(body.pages));
        assert!(body.lines.iter().all(|l| l.y >= CONTENT_FLOOR));
        assert!(body.lines.iter().all(|l| l.y <= CONTINUATION_TOP.max(PAGE_HEIGHT - 70.0)));
        for pair in body.lines.windows(2) {
            if pair[0].page == pair[1].page {
                assert!(pair[1].y < pair[0].y);
            } else {
                assert_eq!(pair[1].page, pair[0].page + 1);
            }
        }

        assert!(render_pdf(&doc).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn short_prescription_fits_one_page() {
        let p = patient();
        let c = consultation(p.id);
        let doc = PrescriptionDocument::from_records("Clínica", &p, &c, "Obst. Rojas");
        let body = layout_body(&doc, PAGE_HEIGHT - 70.0);
        assert_eq!(body.pages, 1);
        assert_eq!(body.lines.len(), 5);
    }

    #[test]
    fn heading_is_not_left_alone_at_page_bottom() {
        let p = patient();
        let c = consultation(p.id);
        let doc = PrescriptionDocument::from_records("Clínica", &p, &c, "Obst. Rojas");
        let body = layout_body(&doc, CONTENT_FLOOR + 2.0);
        assert_eq!(body.lines[0].text, "DIAGNÓSTICO");
        assert_eq!(body.lines[0].page, 1);
        assert_eq!(body.lines[0].y, CONTINUATION_TOP);
    }

    #[test]
    fn wrap_breaks_on_whitespace() {
        let lines = wrap_text("uno dos tres cuatro", 8);
        assert_eq!(lines, vec!["uno dos", "tres", "cuatro"]);
    }

    #[test]
    fn wrap_counts_characters_not_bytes() {
        let lines = wrap_text("ácido fólico", 12);
        assert_eq!(lines, vec!["ácido fólico"]);
    }

    #[test]
    fn wrap_empty_gives_one_line() {
        assert_eq!(wrap_text("   ", 10), vec![String::new()]);
    }
}
