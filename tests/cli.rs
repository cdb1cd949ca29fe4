use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;

mod common;

use common::{open_images_row, write_bmp, write_class_descriptions, write_open_images_csv};

fn oicoco() -> Command {
    Command::cargo_bin("oicoco").unwrap()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read output")).expect("parse output")
}

/// Three images (100x200, 800x200, 50x50), one box each, classes Cat, Dog
/// and Car.
struct OpenImagesFixture {
    dir: tempfile::TempDir,
}

impl OpenImagesFixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        write_bmp(&dir.path().join("images/img1.jpg"), 100, 200);
        write_bmp(&dir.path().join("images/img2.jpg"), 800, 200);
        write_bmp(&dir.path().join("images/img3.jpg"), 50, 50);
        write_open_images_csv(
            &dir.path().join("boxes.csv"),
            &[
                open_images_row("img1", "/m/cat", 0.1, 0.5, 0.2, 0.6),
                open_images_row("img2", "/m/dog", 0.0, 0.5, 0.0, 0.5),
                open_images_row("img3", "/m/car", 0.0, 1.0, 0.0, 1.0),
            ],
        );
        write_class_descriptions(
            &dir.path().join("classes.csv"),
            &[("/m/cat", "Cat"), ("/m/dog", "Dog"), ("/m/car", "Car")],
        );
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn convert(&self) -> Command {
        let mut cmd = oicoco();
        cmd.arg("convert")
            .arg("--annotations")
            .arg(self.path("boxes.csv"))
            .arg("--class-descriptions")
            .arg(self.path("classes.csv"))
            .arg("--image-dir")
            .arg(self.path("images"))
            .arg("--output")
            .arg(self.path("out.json"));
        cmd
    }
}

/// A COCO file with one 200x100 image and one box, next to its image file.
fn coco_fixture(dir: &Path) -> PathBuf {
    write_bmp(&dir.join("images/a.jpg"), 200, 100);
    let path = dir.join("coco.json");
    fs::write(
        &path,
        r#"{
            "info": "Annotations produced from OpenImages. demo",
            "licenses": [],
            "images": [{"id": 1, "width": 200, "height": 100, "file_name": "a.jpg"}],
            "annotations": [{"id": 1, "image_id": 1, "category_id": 1, "bbox": [10, 10, 20, 20],
                             "area": 400, "segmentation": [[10, 10, 10, 30, 30, 30, 30, 10]], "iscrowd": 0}],
            "categories": [{"id": 1, "name": "Cat", "supercategory": "object"}]
        }"#,
    )
    .unwrap();
    path
}

#[test]
fn runs() {
    oicoco().assert().success();
}

#[test]
fn outputs_tool_name() {
    oicoco().arg("-V").assert().success().stdout("oicoco 0.1.0\n");
}

// convert

#[test]
fn convert_keeps_listed_classes_and_renumbers() {
    let fx = OpenImagesFixture::new();
    fx.convert()
        .args(["--keep", "Cat,Dog", "--description", "demo"])
        .assert()
        .success()
        .stdout(contains("Wrote 2 images, 2 annotations and 2 categories"));

    let out = read_json(&fx.path("out.json"));
    assert_eq!(out["info"], "Annotations produced from OpenImages. demo");
    assert_eq!(out["licenses"], serde_json::json!([]));

    let images = out["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["id"], 1);
    assert_eq!(images[0]["file_name"], "img1.jpg");
    assert_eq!(images[0]["width"], 100);
    assert_eq!(images[0]["height"], 200);
    assert_eq!(images[1]["id"], 2);

    let ann = &out["annotations"][0];
    assert_eq!(ann["id"], 1);
    assert_eq!(ann["image_id"], 1);
    assert_eq!(ann["category_id"], 1);
    assert_eq!(ann["bbox"], serde_json::json!([10.0, 40.0, 40.0, 80.0]));
    assert_eq!(ann["area"], 3200.0);
    assert_eq!(
        ann["segmentation"],
        serde_json::json!([[10.0, 40.0, 10.0, 120.0, 50.0, 120.0, 50.0, 40.0]])
    );
    assert_eq!(ann["iscrowd"], 0);

    let cats = out["categories"].as_array().unwrap();
    assert_eq!(cats[0], serde_json::json!({"id": 1, "name": "Cat", "supercategory": "object"}));
    assert_eq!(cats[1]["name"], "Dog");
    assert_eq!(cats[1]["id"], 2);
}

#[test]
fn convert_with_class_id_file() {
    let fx = OpenImagesFixture::new();
    fs::write(fx.path("ids.yaml"), "Dog: 18\nCar: 3\n").unwrap();

    fx.convert()
        .arg("--class-ids")
        .arg(fx.path("ids.yaml"))
        .assert()
        .success();

    let out = read_json(&fx.path("out.json"));
    let cats: Vec<(u64, String)> = out["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| (c["id"].as_u64().unwrap(), c["name"].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(cats, vec![(18, "Dog".to_string()), (3, "Car".to_string())]);
    assert_eq!(out["images"][0]["file_name"], "img2.jpg");
}

#[test]
fn convert_ratio_filter_drops_panoramic_image() {
    let fx = OpenImagesFixture::new();
    fx.convert()
        .args(["--keep", "Cat,Dog", "--min-ratio", "3"])
        .assert()
        .success();

    let out = read_json(&fx.path("out.json"));
    let images = out["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["file_name"], "img1.jpg");
    assert_eq!(out["annotations"].as_array().unwrap().len(), 1);
}

#[test]
fn convert_is_byte_for_byte_deterministic() {
    let fx = OpenImagesFixture::new();
    fx.convert().args(["--keep", "Cat,Dog,Car"]).assert().success();
    let first = fs::read(fx.path("out.json")).unwrap();
    fx.convert().args(["--keep", "Cat,Dog,Car"]).assert().success();
    let second = fs::read(fx.path("out.json")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn convert_copies_images_of_the_output() {
    let fx = OpenImagesFixture::new();
    fs::create_dir(fx.path("copied")).unwrap();
    fx.convert()
        .args(["--keep", "Cat"])
        .arg("--copy-images-to")
        .arg(fx.path("copied"))
        .assert()
        .success();

    assert!(fx.path("copied/img1.jpg").is_file());
    assert!(!fx.path("copied/img2.jpg").exists());
}

#[test]
fn convert_fails_without_image_dir() {
    let fx = OpenImagesFixture::new();
    oicoco()
        .arg("convert")
        .arg("--annotations")
        .arg(fx.path("boxes.csv"))
        .arg("--class-descriptions")
        .arg(fx.path("classes.csv"))
        .args(["--keep", "Cat"])
        .arg("--image-dir")
        .arg(fx.path("nope"))
        .arg("--output")
        .arg(fx.path("out.json"))
        .assert()
        .failure()
        .stderr(contains("does not exist"));
    assert!(!fx.path("out.json").exists());
}

#[test]
fn convert_rejects_wrong_header() {
    let fx = OpenImagesFixture::new();
    fs::write(fx.path("boxes.csv"), "ImageID,LabelName\nimg1,/m/cat\n").unwrap();
    fx.convert()
        .args(["--keep", "Cat"])
        .assert()
        .failure()
        .stderr(contains("Unexpected Open Images CSV header"));
}

#[test]
fn convert_fails_on_missing_image_file() {
    let fx = OpenImagesFixture::new();
    fs::remove_file(fx.path("images/img3.jpg")).unwrap();
    fx.convert()
        .args(["--keep", "Cat"])
        .assert()
        .failure()
        .stderr(contains("img3.jpg"));
}

#[test]
fn convert_reduce_limits_rows_to_qualifying_images() {
    let fx = OpenImagesFixture::new();
    fs::remove_file(fx.path("images/img3.jpg")).unwrap();
    // img3 has no Cat box, so after reduction its file is never looked up
    fx.convert().args(["--keep", "Cat", "--reduce"]).assert().success();

    let out = read_json(&fx.path("out.json"));
    assert_eq!(out["images"].as_array().unwrap().len(), 1);
}

// split

#[test]
fn split_writes_a_seeded_partition() {
    let fx = OpenImagesFixture::new();
    fx.convert().args(["--keep", "Cat,Dog,Car"]).assert().success();

    let run = |a: &str, b: &str| {
        oicoco()
            .arg("split")
            .arg(fx.path("out.json"))
            .args(["--fraction", "0.5", "--seed", "11"])
            .arg("--output-a")
            .arg(fx.path(a))
            .arg("--output-b")
            .arg(fx.path(b))
            .assert()
            .success()
            .stdout(contains("Split 3 images"));
    };
    run("a.json", "b.json");
    run("a2.json", "b2.json");

    let a = read_json(&fx.path("a.json"));
    let b = read_json(&fx.path("b.json"));
    let images_a = a["images"].as_array().unwrap();
    let images_b = b["images"].as_array().unwrap();
    assert_eq!(images_a.len() + images_b.len(), 3);
    for (i, img) in images_a.iter().enumerate() {
        assert_eq!(img["id"], i as u64);
    }
    assert!(a["info"].as_str().unwrap().ends_with(" Split 0.5"));
    assert_eq!(a["categories"], b["categories"]);

    assert_eq!(fs::read(fx.path("a.json")).unwrap(), fs::read(fx.path("a2.json")).unwrap());
}

#[test]
fn split_rejects_fraction_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let input = coco_fixture(dir.path());
    oicoco()
        .arg("split")
        .arg(&input)
        .args(["--fraction", "1.5"])
        .arg("--output-a")
        .arg(dir.path().join("a.json"))
        .arg("--output-b")
        .arg(dir.path().join("b.json"))
        .assert()
        .failure()
        .stderr(contains("Invalid argument"));
    assert!(!dir.path().join("a.json").exists());
}

#[test]
fn split_rejects_empty_payload() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("empty.json"), "{}").unwrap();
    oicoco()
        .arg("split")
        .arg(dir.path().join("empty.json"))
        .args(["--fraction", "0.5"])
        .arg("--output-a")
        .arg(dir.path().join("a.json"))
        .arg("--output-b")
        .arg(dir.path().join("b.json"))
        .assert()
        .failure()
        .stderr(contains("empty"));
}

// resize

#[test]
fn resize_halves_images_and_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let input = coco_fixture(dir.path());
    fs::create_dir(dir.path().join("small")).unwrap();

    oicoco()
        .arg("resize")
        .arg("--images")
        .arg(dir.path().join("images"))
        .arg("--annotations")
        .arg(&input)
        .args(["--factor", "0.5"])
        .arg("--output-images")
        .arg(dir.path().join("small"))
        .arg("--output")
        .arg(dir.path().join("small.json"))
        .assert()
        .success()
        .stdout(contains("Resized 1 images"));

    let out = read_json(&dir.path().join("small.json"));
    assert_eq!(out["images"][0]["width"], 100);
    assert_eq!(out["images"][0]["height"], 50);
    assert_eq!(out["annotations"][0]["bbox"], serde_json::json!([5.0, 5.0, 10.0, 10.0]));
    assert_eq!(out["annotations"][0]["area"], 100.0);

    let size = imagesize::size(dir.path().join("small/a.jpg")).expect("resized image");
    assert_eq!((size.width, size.height), (100, 50));
}

#[test]
fn resize_drop_policy_removes_missing_images() {
    let dir = tempfile::tempdir().unwrap();
    let input = coco_fixture(dir.path());
    fs::remove_file(dir.path().join("images/a.jpg")).unwrap();
    fs::create_dir(dir.path().join("small")).unwrap();

    oicoco()
        .arg("resize")
        .arg("--images")
        .arg(dir.path().join("images"))
        .arg("--annotations")
        .arg(&input)
        .args(["--factor", "0.5", "--on-missing", "drop"])
        .arg("--output-images")
        .arg(dir.path().join("small"))
        .arg("--output")
        .arg(dir.path().join("small.json"))
        .assert()
        .success()
        .stdout(contains("1 missing"));

    let out = read_json(&dir.path().join("small.json"));
    assert_eq!(out["images"].as_array().unwrap().len(), 0);
    assert_eq!(out["annotations"].as_array().unwrap().len(), 0);
}

// copy-images

#[test]
fn copy_images_require_all_fails_on_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = coco_fixture(dir.path());
    fs::create_dir(dir.path().join("empty")).unwrap();
    fs::create_dir(dir.path().join("dest")).unwrap();

    oicoco()
        .arg("copy-images")
        .arg("--annotations")
        .arg(&input)
        .arg("--from")
        .arg(dir.path().join("empty"))
        .arg("--to")
        .arg(dir.path().join("dest"))
        .arg("--require-all")
        .assert()
        .failure()
        .stderr(contains("a.jpg"));

    oicoco()
        .arg("copy-images")
        .arg("--annotations")
        .arg(&input)
        .arg("--from")
        .arg(dir.path().join("empty"))
        .arg(dir.path().join("images"))
        .arg("--to")
        .arg(dir.path().join("dest"))
        .assert()
        .success()
        .stdout(contains("Copied 1 images"));
    assert!(dir.path().join("dest/a.jpg").is_file());
}

// validate

#[test]
fn validate_converted_dataset_passes() {
    let dir = tempfile::tempdir().unwrap();
    let input = coco_fixture(dir.path());
    oicoco()
        .arg("validate")
        .arg(&input)
        .assert()
        .success()
        .stdout(contains("Validation passed"));
}

#[test]
fn validate_reports_broken_references() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(
        &path,
        r#"{
            "images": [{"id": 1, "width": 10, "height": 10, "file_name": "a.jpg"},
                       {"id": 1, "width": 10, "height": 10, "file_name": "b.jpg"}],
            "annotations": [{"id": 1, "image_id": 7, "category_id": 9, "bbox": [0, 0, 1, 1], "area": 1}],
            "categories": [{"id": 1, "name": "Cat"}]
        }"#,
    )
    .unwrap();

    oicoco()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stdout(contains("DuplicateImageId"))
        .stdout(contains("MissingImageRef"))
        .stdout(contains("MissingCategoryRef"));
}

#[test]
fn validate_json_output_and_strict_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lonely.json");
    fs::write(
        &path,
        r#"{"images": [{"id": 0, "width": 10, "height": 10, "file_name": "a.jpg"}],
            "annotations": [], "categories": []}"#,
    )
    .unwrap();

    oicoco()
        .arg("validate")
        .arg(&path)
        .args(["--output", "json"])
        .assert()
        .success()
        .stdout(contains("\"error_count\": 0"))
        .stdout(contains("\"warning_count\": 1"))
        .stdout(contains("ImageWithoutAnnotations"));

    oicoco().arg("validate").arg(&path).arg("--strict").assert().failure();
}

#[test]
fn validate_nonexistent_file_fails() {
    oicoco()
        .args(["validate", "nonexistent_file.json"])
        .assert()
        .failure();
}
