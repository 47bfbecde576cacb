// ABOUTME: Deck generation module for the slidecast application
// ABOUTME: Writes a title-and-bullets PowerPoint deck from a script and reads decks back

use crate::errors::{Result, SlidecastError};
use crate::script::Script;
use crate::utils;
use log::{debug, info};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs;
use std::io::{Read, Seek, Write};
use std::path::Path;
use zip::{write::FileOptions, ZipArchive, ZipWriter};

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

// 16:9 slide size in EMU
const SLIDE_CX: u64 = 9_144_000;
const SLIDE_CY: u64 = 5_143_500;

/// A slide as read back from a deck
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeckSlide {
    pub title: String,
    pub bullets: Vec<String>,
}

/// Build a deck from a script and write it to `output_file`, replacing any existing file.
pub fn build_deck(script: &Script, output_file: &Path) -> Result<()> {
    info!(
        "Building deck with {} slides at {:?}",
        script.len(),
        output_file
    );
    utils::ensure_parent_directory_exists(output_file)?;

    let file = fs::File::create(output_file)?;
    let mut zip = ZipWriter::new(file);
    write_package(&mut zip, script)?;
    zip.finish()?;

    info!("Deck written to {:?}", output_file);
    Ok(())
}

fn write_part<W: Write + Seek>(zip: &mut ZipWriter<W>, name: &str, body: &str) -> Result<()> {
    debug!("Writing deck part {}", name);
    zip.start_file(name, FileOptions::default())?;
    zip.write_all(body.as_bytes())?;
    Ok(())
}

fn write_package<W: Write + Seek>(zip: &mut ZipWriter<W>, script: &Script) -> Result<()> {
    let count = script.len();

    write_part(zip, "[Content_Types].xml", &content_types_xml(count))?;
    write_part(zip, "_rels/.rels", ROOT_RELS_XML)?;
    write_part(zip, "docProps/app.xml", &app_xml(count))?;
    write_part(zip, "docProps/core.xml", &core_xml())?;
    write_part(
        zip,
        "ppt/_rels/presentation.xml.rels",
        &presentation_rels_xml(count),
    )?;
    write_part(zip, "ppt/presentation.xml", &presentation_xml(count))?;
    write_part(zip, "ppt/slideMasters/slideMaster1.xml", &slide_master_xml())?;
    write_part(
        zip,
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="{base}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
    <Relationship Id="rId2" Type="{base}/theme" Target="../theme/theme1.xml"/>
</Relationships>"#,
            base = REL_BASE
        ),
    )?;
    write_part(zip, "ppt/slideLayouts/slideLayout1.xml", &slide_layout_xml())?;
    write_part(
        zip,
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="{base}/slideMaster" Target="../slideMasters/slideMaster1.xml"/>
</Relationships>"#,
            base = REL_BASE
        ),
    )?;
    write_part(zip, "ppt/theme/theme1.xml", THEME_XML)?;

    for (i, slide) in script.slides.iter().enumerate() {
        let slide_num = i + 1;
        info!("Adding slide {}: {:?}", slide_num, slide.title);
        write_part(
            zip,
            &format!("ppt/slides/_rels/slide{}.xml.rels", slide_num),
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="{base}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
</Relationships>"#,
                base = REL_BASE
            ),
        )?;
        write_part(
            zip,
            &format!("ppt/slides/slide{}.xml", slide_num),
            &slide_xml(&slide.title, &slide.bullets),
        )?;
    }

    Ok(())
}

fn content_types_xml(count: usize) -> String {
    let slides = (1..=count)
        .map(|n| {
            format!(
                r#"    <Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                n
            )
        })
        .collect::<Vec<String>>()
        .join("\n");

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="xml" ContentType="application/xml"/>
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
    <Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
    <Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
    <Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>
    <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
    <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
{}
</Types>"#,
        slides
    )
}

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
    <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

fn app_xml(count: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <Application>slidecast</Application>
    <Slides>{}</Slides>
</Properties>"#,
        count
    )
}

fn core_xml() -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:title>Presentation</dc:title>
    <dc:creator>slidecast</dc:creator>
    <dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created>
    <dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified>
    <cp:revision>1</cp:revision>
</cp:coreProperties>"#,
        now = now
    )
}

// rId1 is the slide master; slides start at rId2.
fn presentation_rels_xml(count: usize) -> String {
    let mut rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="{}/slideMaster" Target="slideMasters/slideMaster1.xml"/>
"#,
        REL_BASE
    );
    for n in 1..=count {
        rels.push_str(&format!(
            r#"    <Relationship Id="rId{}" Type="{}/slide" Target="slides/slide{}.xml"/>"#,
            n + 1,
            REL_BASE,
            n
        ));
        rels.push('\n');
    }
    rels.push_str("</Relationships>");
    rels
}

fn presentation_xml(count: usize) -> String {
    let slide_ids = (1..=count)
        .map(|n| format!(r#"        <p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1))
        .collect::<Vec<String>>()
        .join("\n");
    // An empty sldIdLst is not schema-valid; omit it for empty decks.
    let slide_list = if count == 0 {
        String::new()
    } else {
        format!("    <p:sldIdLst>\n{}\n    </p:sldIdLst>\n", slide_ids)
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}" saveSubsetFonts="1">
    <p:sldMasterIdLst>
        <p:sldMasterId id="2147483648" r:id="rId1"/>
    </p:sldMasterIdLst>
{slide_list}    <p:sldSz cx="{cx}" cy="{cy}"/>
    <p:notesSz cx="6858000" cy="9144000"/>
</p:presentation>"#,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        slide_list = slide_list,
        cx = SLIDE_CX,
        cy = SLIDE_CY
    )
}

const GROUP_PROPS: &str = r#"            <p:nvGrpSpPr>
                <p:cNvPr id="1" name=""/>
                <p:cNvGrpSpPr/>
                <p:nvPr/>
            </p:nvGrpSpPr>
            <p:grpSpPr>
                <a:xfrm>
                    <a:off x="0" y="0"/>
                    <a:ext cx="0" cy="0"/>
                    <a:chOff x="0" y="0"/>
                    <a:chExt cx="0" cy="0"/>
                </a:xfrm>
            </p:grpSpPr>"#;

/// A placeholder shape; `geometry` is only set on the master and layout.
fn placeholder_shape(
    id: u32,
    name: &str,
    ph: &str,
    geometry: Option<(u64, u64, u64, u64)>,
    body: &str,
) -> String {
    let sp_pr = match geometry {
        Some((x, y, cx, cy)) => format!(
            r#"<p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm></p:spPr>"#,
            x, y, cx, cy
        ),
        None => "<p:spPr/>".to_string(),
    };
    format!(
        r#"            <p:sp>
                <p:nvSpPr>
                    <p:cNvPr id="{id}" name="{name}"/>
                    <p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>
                    <p:nvPr>{ph}</p:nvPr>
                </p:nvSpPr>
                {sp_pr}
                <p:txBody>
                    <a:bodyPr/>
                    <a:lstStyle/>
{body}
                </p:txBody>
            </p:sp>"#,
        id = id,
        name = name,
        ph = ph,
        sp_pr = sp_pr,
        body = body
    )
}

const TITLE_PH: &str = r#"<p:ph type="title"/>"#;
const BODY_PH: &str = r#"<p:ph idx="1"/>"#;
const TITLE_GEOMETRY: (u64, u64, u64, u64) = (457_200, 205_979, 8_229_600, 857_250);
const BODY_GEOMETRY: (u64, u64, u64, u64) = (457_200, 1_200_151, 8_229_600, 3_394_472);

fn slide_xml(title: &str, bullets: &[String]) -> String {
    let title_body = format!(
        r#"                    <a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
        escape(title)
    );

    let bullet_body = if bullets.is_empty() {
        // txBody must hold at least one paragraph.
        "                    <a:p><a:endParaRPr lang=\"en-US\" dirty=\"0\"/></a:p>".to_string()
    } else {
        bullets
            .iter()
            .map(|b| {
                format!(
                    r#"                    <a:p><a:pPr lvl="1"/><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                    escape(b.as_str())
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}">
    <p:cSld>
        <p:spTree>
{group}
{title}
{body}
        </p:spTree>
    </p:cSld>
    <p:clrMapOvr>
        <a:masterClrMapping/>
    </p:clrMapOvr>
</p:sld>"#,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        group = GROUP_PROPS,
        title = placeholder_shape(2, "Title 1", TITLE_PH, None, &title_body),
        body = placeholder_shape(3, "Content Placeholder 2", BODY_PH, None, &bullet_body)
    )
}

const EMPTY_PARAGRAPH: &str = "                    <a:p><a:endParaRPr lang=\"en-US\"/></a:p>";

fn slide_layout_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}" type="obj" preserve="1">
    <p:cSld name="Title and Content">
        <p:spTree>
{group}
{title}
{body}
        </p:spTree>
    </p:cSld>
    <p:clrMapOvr>
        <a:masterClrMapping/>
    </p:clrMapOvr>
</p:sldLayout>"#,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        group = GROUP_PROPS,
        title = placeholder_shape(
            2,
            "Title 1",
            TITLE_PH,
            Some(TITLE_GEOMETRY),
            EMPTY_PARAGRAPH,
        ),
        body = placeholder_shape(
            3,
            "Content Placeholder 2",
            BODY_PH,
            Some(BODY_GEOMETRY),
            EMPTY_PARAGRAPH,
        )
    )
}

fn slide_master_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}">
    <p:cSld>
        <p:bg>
            <p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef>
        </p:bg>
        <p:spTree>
{group}
{title}
{body}
        </p:spTree>
    </p:cSld>
    <p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
    <p:sldLayoutIdLst>
        <p:sldLayoutId id="2147483649" r:id="rId1"/>
    </p:sldLayoutIdLst>
    <p:txStyles>
        <p:titleStyle>
            <a:lvl1pPr algn="l"><a:defRPr sz="4000"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mj-lt"/></a:defRPr></a:lvl1pPr>
        </p:titleStyle>
        <p:bodyStyle>
            <a:lvl1pPr marL="228600" indent="-228600"><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/><a:defRPr sz="2800"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr>
            <a:lvl2pPr marL="685800" indent="-228600"><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/><a:defRPr sz="2400"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl2pPr>
        </p:bodyStyle>
        <p:otherStyle>
            <a:lvl1pPr><a:defRPr sz="1800"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill></a:defRPr></a:lvl1pPr>
        </p:otherStyle>
    </p:txStyles>
</p:sldMaster>"#,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        group = GROUP_PROPS,
        title = placeholder_shape(
            2,
            "Title Placeholder 1",
            TITLE_PH,
            Some(TITLE_GEOMETRY),
            EMPTY_PARAGRAPH,
        ),
        body = placeholder_shape(
            3,
            "Text Placeholder 2",
            r#"<p:ph type="body" idx="1"/>"#,
            Some(BODY_GEOMETRY),
            EMPTY_PARAGRAPH,
        )
    )
}

const THEME_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme">
    <a:themeElements>
        <a:clrScheme name="Office">
            <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
            <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
            <a:dk2><a:srgbClr val="1F497D"/></a:dk2>
            <a:lt2><a:srgbClr val="EEECE1"/></a:lt2>
            <a:accent1><a:srgbClr val="4F81BD"/></a:accent1>
            <a:accent2><a:srgbClr val="C0504D"/></a:accent2>
            <a:accent3><a:srgbClr val="9BBB59"/></a:accent3>
            <a:accent4><a:srgbClr val="8064A2"/></a:accent4>
            <a:accent5><a:srgbClr val="4BACC6"/></a:accent5>
            <a:accent6><a:srgbClr val="F79646"/></a:accent6>
            <a:hlink><a:srgbClr val="0000FF"/></a:hlink>
            <a:folHlink><a:srgbClr val="800080"/></a:folHlink>
        </a:clrScheme>
        <a:fontScheme name="Office">
            <a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>
            <a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>
        </a:fontScheme>
        <a:fmtScheme name="Office">
            <a:fillStyleLst>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
            </a:fillStyleLst>
            <a:lnStyleLst>
                <a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
                <a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
                <a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
            </a:lnStyleLst>
            <a:effectStyleLst>
                <a:effectStyle><a:effectLst/></a:effectStyle>
                <a:effectStyle><a:effectLst/></a:effectStyle>
                <a:effectStyle><a:effectLst/></a:effectStyle>
            </a:effectStyleLst>
            <a:bgFillStyleLst>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
            </a:bgFillStyleLst>
        </a:fmtScheme>
    </a:themeElements>
    <a:objectDefaults/>
    <a:extraClrSchemeLst/>
</a:theme>"#;

/// Read the slides of a deck back, in slide order.
pub fn read_deck(path: &Path) -> Result<Vec<DeckSlide>> {
    utils::validate_file_exists(path)?;
    let file = fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut slides = Vec::new();
    for n in 1.. {
        let name = format!("ppt/slides/slide{}.xml", n);
        let xml = match read_part(&mut archive, &name)? {
            Some(xml) => xml,
            None => break,
        };
        slides.push(parse_slide_xml(&xml)?);
    }
    debug!("Read {} slides from {:?}", slides.len(), path);
    Ok(slides)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

#[derive(Clone, Copy, PartialEq)]
enum Placeholder {
    None,
    Title,
    Body,
}

fn parse_slide_xml(xml: &str) -> Result<DeckSlide> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut slide = DeckSlide::default();
    let mut current = Placeholder::None;
    let mut in_text = false;
    let mut paragraph = String::new();
    let mut level: Option<u32> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"p:ph" => {
                current = Placeholder::Body;
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"type" {
                        let value = attr.unescape_value()?;
                        if value == "title" || value == "ctrTitle" {
                            current = Placeholder::Title;
                        }
                    }
                }
            }
            Event::Start(e) if e.name().as_ref() == b"a:p" => {
                paragraph.clear();
                level = None;
            }
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"a:pPr" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"lvl" {
                        level = attr.unescape_value()?.parse().ok();
                    }
                }
            }
            Event::Start(e) if e.name().as_ref() == b"a:t" => in_text = true,
            Event::End(e) if e.name().as_ref() == b"a:t" => in_text = false,
            Event::Text(t) if in_text => paragraph.push_str(&t.unescape()?),
            Event::End(e) if e.name().as_ref() == b"a:p" => match current {
                Placeholder::Title => {
                    if !slide.title.is_empty() && !paragraph.is_empty() {
                        slide.title.push('\n');
                    }
                    slide.title.push_str(&paragraph);
                }
                Placeholder::Body if level.is_some() => slide.bullets.push(paragraph.clone()),
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"p:sp" => current = Placeholder::None,
            Event::Eof => break,
            _ => {}
        }
    }

    if slide.title.is_empty() && slide.bullets.is_empty() && !xml.contains("<p:ph") {
        return Err(SlidecastError::Deck(
            "slide has no title or body placeholder".to_string(),
        ));
    }
    Ok(slide)
}
