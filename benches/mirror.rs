use criterion::{criterion_group, criterion_main, Criterion};
use mirrortools_lib::copy_folder_contents;
use std::fs;
use std::path::Path;

fn build_tree(root: &Path, dirs: usize, files_per_dir: usize) {
    for d in 0..dirs {
        let dir = root.join(format!("dir{}", d)).join("nested");
        fs::create_dir_all(&dir).unwrap();
        for f in 0..files_per_dir {
            fs::write(dir.join(format!("file{}.txt", f)), vec![b'x'; 4096]).unwrap();
        }
        fs::create_dir_all(root.join(format!("dir{}/.cache", d))).unwrap();
        fs::write(root.join(format!("dir{}/.cache/skip", d)), b"skip").unwrap();
    }
}

fn bench_mirror(c: &mut Criterion) {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    build_tree(&src, 20, 50);

    // 每次迭代都会先按清单清理上一次的结果
    c.bench_function("mirror_1000_files_rerun", |b| {
        b.iter(|| copy_folder_contents(&src, &dst, ".manifest").unwrap())
    });
}

criterion_group!(benches, bench_mirror);
criterion_main!(benches);
